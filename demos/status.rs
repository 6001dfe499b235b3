use htcc::{HtccClient, MessageLogMode};
use std::env;

#[tokio::main]
async fn main() -> htcc::Result<()> {
    tracing_subscriber::fmt::init();

    let username = env::var("HTCC_USERNAME").expect("HTCC_USERNAME must be set");
    let password = env::var("HTCC_PASSWORD").expect("HTCC_PASSWORD must be set");
    let log_path = env::args().nth(1);

    let mut builder = HtccClient::builder();
    if let Some(path) = log_path {
        builder = builder.message_log(MessageLogMode::Diffed, path);
    }

    println!("Logging in as {username}...");
    let mut client = builder.login(&username, &password).await?;
    if !client.is_authenticated() {
        eprintln!("Login rejected, check credentials");
        return Ok(());
    }

    for thermostat in client.thermostats_mut() {
        println!("[{}] {} ({})", thermostat.id(), thermostat.name(), thermostat.mac_address());
        let modes = thermostat.allowed_system_modes().await?;

        thermostat.refresh_status().await?;
        let mut t = thermostat.no_refresh();
        if !t.is_connected().await? {
            println!("  offline");
            continue;
        }
        let unit = t.temperature_unit().await?;
        let temp = t.current_temperature().await?;
        let mode = t.system_mode().await?;
        let (heat, cool) = (t.heat_setpoint().await?, t.cool_setpoint().await?);
        let (hold, until) = (t.hold().await?, t.hold_until().await?);
        println!(
            "  {temp:.1}\u{00b0}{unit} | mode: {mode} | heat {heat:.1} / cool {cool:.1} | hold: {hold} until {until}"
        );
        let fan = t.fan_mode().await?;
        let output = t.output_status().await?;
        println!("  fan: {fan} | output: {output} | allowed modes: {modes:?}");
    }
    Ok(())
}
