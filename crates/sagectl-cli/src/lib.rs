pub mod catalog;
pub mod deploy;
pub mod list;
pub mod settings;
pub mod teardown;

pub use catalog::{ArtifactResolver, Catalog, FixedArtifact, ResolvedArtifact};
pub use deploy::{deploy, DeployError, DeployRequest, EndpointHandle};
pub use list::{collect_all, list, ListError, ListOptions, Listing};
pub use settings::Settings;
pub use teardown::{teardown, Deleted, TeardownFailure, TeardownReport, TeardownStep};
