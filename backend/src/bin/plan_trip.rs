use std::process::ExitCode;

use clap::Parser;
use roadtrip::config::AppConfig;
use roadtrip::error_body;
use roadtrip::models::TripPlanRequest;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Plan a road trip and list places along the route"
)]
struct Args {
    /// Starting place, e.g. "Mumbai"
    #[arg(long)]
    from: String,

    #[arg(long)]
    to: String,

    /// Trip date as YYYY-MM-DD
    #[arg(long)]
    date: String,

    #[arg(long, default_value = "car")]
    vehicle: String,

    /// Intermediate stop; repeat for several, in travel order
    #[arg(long = "via")]
    via: Vec<String>,

    /// Place category such as Beach or Restaurant; repeatable
    #[arg(long = "pref", required = true)]
    preferences: Vec<String>,

    /// Search radius around each sampled point, in km
    #[arg(long)]
    radius_km: Option<i64>,
}

impl Args {
    fn into_request(self) -> TripPlanRequest {
        let request = TripPlanRequest::new(self.from, self.to, self.date, self.vehicle, self.preferences)
            .with_via(self.via);
        match self.radius_km {
            Some(radius) => request.with_radius_km(radius),
            None => request,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let planner = AppConfig::from_env()?.build_planner()?;

    match planner.plan_trip(&args.into_request()).await {
        Ok(plan) => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let body = error_body(&planner, &err);
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::FAILURE)
        }
    }
}
