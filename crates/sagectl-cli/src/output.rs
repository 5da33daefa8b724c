use chrono::{DateTime, Utc};

use sagectl::{EndpointHandle, Listing, TeardownFailure, TeardownReport};
use sagectl_common::{Collected, EndpointSummary, ModelSummary};

pub fn print_listing(listing: &Listing) {
    if let Some(models) = &listing.models {
        print_models(models);
    }
    if let Some(endpoints) = &listing.endpoints {
        print_endpoints(endpoints);
    }
}

pub fn print_models(models: &Collected<ModelSummary>) {
    println!("\n=== Models ===\n");
    if models.is_empty() {
        println!("No models found.");
        println!();
        return;
    }
    println!("{:<60} {:<20}", "Name", "Created");
    println!("{:-<80}", "");
    for m in &models.items {
        println!("{:<60} {:<20}", m.model_name, format_time(&m.creation_time));
    }
    println!();
}

pub fn print_endpoints(endpoints: &Collected<EndpointSummary>) {
    println!("\n=== Endpoints ===\n");
    if endpoints.is_empty() {
        println!("No endpoints found.");
        println!();
        return;
    }
    println!("{:<50} {:<22} {:<20}", "Name", "Status", "Created");
    println!("{:-<92}", "");
    for ep in &endpoints.items {
        println!(
            "{:<50} {:<22} {:<20}",
            ep.endpoint_name,
            ep.endpoint_status.as_str(),
            format_time(&ep.creation_time)
        );
    }
    println!();
}

/// Tables, or pretty JSON when `json` is set.
pub fn print_listing_as(listing: &Listing, json: bool) {
    if json {
        println!("{}", listing_json(listing));
    } else {
        print_listing(listing);
    }
}

pub fn listing_json(listing: &Listing) -> String {
    serde_json::to_string_pretty(listing).unwrap_or_default()
}

pub fn print_deployed(handle: &EndpointHandle) {
    match &handle.status {
        Some(status) => println!("✓ Endpoint '{}' is {}", handle.endpoint_name, status),
        None => println!(
            "✓ Endpoint '{}' creation started (model '{}')",
            handle.endpoint_name, handle.model_name
        ),
    }
}

pub fn print_teardown(report: &TeardownReport) {
    println!("✓ Endpoint '{}' deleted", report.endpoint_name);
    println!("  config:  {}", report.endpoint_config_name);
    if report.models_kept {
        println!("  models:  kept ({})", report.models.join(", "));
    } else if report.models.is_empty() {
        println!("  models:  none referenced");
    } else {
        println!("  models:  deleted ({})", report.models.join(", "));
    }
}

pub fn print_teardown_failure(failure: &TeardownFailure) {
    eprintln!("✗ Failed to delete endpoint '{}': {}", failure.endpoint_name, failure.source);
    if failure.config_removed_out_of_band() {
        eprintln!("  the endpoint config is gone; it may have been deleted outside this tool");
    }
    if !failure.deleted.is_empty() {
        eprintln!("  already deleted before the failure: {:?}", failure.deleted);
    }
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_partial_listing_json_keeps_models() {
        let mut models = Collected::default();
        models.items.push(ModelSummary {
            model_name: "demo-model".to_string(),
            model_arn: "arn:demo".to_string(),
            creation_time: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        });
        models.pages = 1;
        let partial = Listing {
            models: Some(models),
            endpoints: None,
        };

        let v: serde_json::Value = serde_json::from_str(&listing_json(&partial)).unwrap();
        assert_eq!(v["models"]["items"][0]["ModelName"], "demo-model");
        assert!(v.get("endpoints").is_none());
    }
}
