use hive_state::client::HiveClient;
use hive_state::config::Config;
use hive_state::envfile;
use hive_state::schedule::ResolvedSchedule;
use hive_state::session::{HiveSession, SystemClock};
use hive_state::snapshot::EntityRole;
use log::{error, info, warn};
use std::thread;
use std::time::Instant;

fn describe_schedule(resolved: Option<ResolvedSchedule>) -> String {
    match resolved {
        Some(s) => format!(
            "now={}..{} next={}..{} later={}..{}",
            s.now.start.format("%a %H:%M"),
            s.now.end.format("%a %H:%M"),
            s.next.start.format("%a %H:%M"),
            s.next.end.format("%a %H:%M"),
            s.later.start.format("%a %H:%M"),
            s.later.end.format("%a %H:%M"),
        ),
        None => "-".to_string(),
    }
}

fn log_status(session: &HiveSession) {
    for entity in session.entities() {
        let label = entity.name.as_deref().unwrap_or("default");
        match entity.role {
            EntityRole::Heating => {
                let heating = session.heating();
                info!(
                    "Heating[{}] mode={} boost={} state={} target={:.1} current={:.1} schedule: {}",
                    label,
                    heating.mode(&entity.id).as_str(),
                    heating.boost(&entity.id).as_str(),
                    heating.state(&entity.id).as_str(),
                    heating.target_temperature(&entity.id),
                    heating.current_temperature(&entity.id),
                    describe_schedule(heating.schedule_now_next_later(&entity.id))
                );
            }
            EntityRole::HotWater => {
                let hot_water = session.hot_water();
                info!(
                    "HotWater[{}] mode={} boost={} state={} schedule: {}",
                    label,
                    hot_water.mode(&entity.id).as_str(),
                    hot_water.boost(&entity.id).as_str(),
                    hot_water.state(&entity.id).as_str(),
                    describe_schedule(hot_water.schedule_now_next_later(&entity.id))
                );
            }
            _ => {}
        }
    }
    if let Some(temperature) = session.weather().temperature() {
        info!(
            "Outside temperature {:.1}{}",
            temperature,
            session.weather().unit().unwrap_or_default()
        );
    }
}

pub fn run() -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (update_interval={}s, weather_interval={}s, poll_enabled={}, max_request_retries={})",
        cfg.update_interval.as_secs(),
        cfg.weather_interval.as_secs(),
        cfg.poll_enabled,
        cfg.max_request_retries.get()
    );

    // 2) Log on
    let client = HiveClient::new(
        &cfg.username,
        &cfg.password,
        &cfg.login_url,
        &cfg.weather_url,
        cfg.max_request_retries,
    )
    .map_err(|e| format!("Hive logon failed (credentials invalid?): {}", e))?;
    info!("Authenticated to Hive API");

    // 3) First snapshot
    let session = HiveSession::new(Box::new(client), Box::new(SystemClock), cfg.session_options());
    session
        .refresh()
        .map_err(|e| format!("initial snapshot failed: {}", e))?;

    let entities = session.entities();
    if entities.is_empty() {
        warn!("No supported devices found on this account");
    }
    for entity in &entities {
        info!(
            "Discovered {:?} {} ({}){}",
            entity.role,
            entity.id,
            entity.device_type,
            entity.name.as_deref().map(|n| format!(" \"{}\"", n)).unwrap_or_default()
        );
    }
    log_status(&session);

    // 4) Poll loop (steady cadence)
    if !cfg.poll_enabled {
        info!("Polling disabled via POLL_ENABLED={}", cfg.poll_enabled);
        return Ok(());
    }
    let interval = cfg.update_interval.min(cfg.weather_interval);
    info!("Starting poll loop: interval={}s", interval.as_secs());
    loop {
        let tick_start = Instant::now();

        match session.refresh_if_due() {
            Ok(true) => log_status(&session),
            Ok(false) => {}
            Err(e) => warn!("Snapshot refresh failed; keeping previous snapshot: {}", e),
        }
        if let Err(e) = session.refresh_weather_if_due() {
            warn!("Weather refresh failed: {}", e);
        }

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
}

fn main() {
    let loaded_env = match envfile::configure_from_args(std::env::args_os().skip(1)) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "hive-state {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run() {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
