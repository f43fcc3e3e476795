//! Describe a device and monitor its events.
//!
//! Usage: cargo run --example describe_and_monitor -- <description-url>

use upnp_client::{DeviceClient, ServiceEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .ok_or("usage: describe_and_monitor <description-url>")?;

    let client = DeviceClient::new(&url)?;

    let device = client.device_description().await?;
    println!("{} — {} ({})", device.friendly_name, device.model_name, device.udn);

    for (service_id, service) in &device.services {
        println!("  {service_id}");
        println!("    type:    {}", service.service_type);
        println!("    control: {}", service.control_url);
        println!("    events:  {}", service.event_sub_url);

        let schema = client.service_description(service_id).await?;
        for (name, action) in &schema.actions {
            println!(
                "    action {name} ({} in, {} out)",
                action.inputs.len(),
                action.outputs.len()
            );
        }
    }

    // Subscribe to every service and print what arrives.
    for service_id in device.services.keys() {
        let id = service_id.clone();
        client
            .subscribe(service_id, move |event| match event {
                ServiceEvent::PropertyChange(properties) => {
                    println!("[{id}] {properties:?}");
                }
                ServiceEvent::SubscriptionLost { reason } => {
                    println!("[{id}] subscription lost: {reason}");
                }
            })
            .await?;
    }

    println!("listening for events, ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    client.dispose().await;
    Ok(())
}
