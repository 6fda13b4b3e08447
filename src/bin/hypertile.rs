use std::path::PathBuf;
use std::process;

use clap::Parser;
use hypertile::common::config::{Config, config_file};
use hypertile::common::log;

#[derive(Parser)]
#[command(version, about = "Keyboard-driven tiling for macOS")]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Check the configuration file and exit.
    #[arg(long)]
    validate: bool,

    /// Leave the keyboard mapping alone even if the config asks for the Caps
    /// Lock remap.
    #[arg(long)]
    no_remap: bool,
}

fn main() {
    sigpipe::reset();
    let opt = Cli::parse();

    if std::env::var_os("RUST_BACKTRACE").is_none() {
        // SAFETY: We are single threaded at this point.
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }
    log::init_logging();
    install_panic_hook();

    let config_path = opt.config.clone().unwrap_or_else(config_file);

    if opt.validate {
        let config = match Config::read(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{e:#}");
                process::exit(1);
            }
        };
        let issues = config.validate();
        if issues.is_empty() {
            println!("Config validation passed");
        } else {
            for issue in issues {
                eprintln!("{issue}");
            }
            process::exit(1);
        }
        return;
    }

    let config = Config::load_or_default(&config_path);
    for issue in config.validate() {
        tracing::warn!("config: {issue}");
    }

    run(config, config_path, opt.no_remap);
}

#[cfg(target_os = "macos")]
fn run(config: Config, config_path: PathBuf, no_remap: bool) {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use hypertile::actor::config_watcher::ConfigWatcher;
    use hypertile::actor::event_tap::CaptureContext;
    use hypertile::actor::reactor::{self, Reactor};
    use hypertile::actor::{self, border};
    use hypertile::sys::macos::event_tap::run_capture;
    use hypertile::sys::macos::keyboard::{
        CapsLockIndicator, clear_caps_lock_remap, is_process_trusted, remap_caps_lock,
    };
    use hypertile::sys::macos::notification_center::NotificationCenter;
    use hypertile::sys::macos::window_system::MacWindowSystem;
    use hypertile::sys::timer::TokioTimer;
    use objc2::MainThreadMarker;
    use objc2_core_foundation::CFRunLoop;
    use tracing::{error, info, warn};

    let Some(mtm) = MainThreadMarker::new() else {
        eprintln!("hypertile must start on the main thread");
        process::exit(1);
    };
    {
        use objc2_app_kit::{NSApplication, NSApplicationActivationPolicy};
        let app = NSApplication::sharedApplication(mtm);
        let _ = app.setActivationPolicy(NSApplicationActivationPolicy::Accessory);
    }

    if !is_process_trusted() {
        error!(
            "Accessibility and input monitoring permission is required. Grant it in System \
             Settings > Privacy & Security, then restart hypertile."
        );
        process::exit(1);
    }

    let hyper_key = match config.settings.hyper.key_code() {
        Ok(key) => key,
        Err(e) => {
            error!("Invalid hyper key: {e}");
            process::exit(1);
        }
    };
    let remapped = config.settings.hyper.remap_caps_lock && !no_remap;
    if remapped && let Err(e) = remap_caps_lock(hyper_key) {
        error!("Could not remap Caps Lock: {e:#}");
        process::exit(1);
    }

    let (events_tx, events_rx) = actor::channel();
    let capture = match CaptureContext::new(
        &config.settings.hyper,
        config.bindings.clone(),
        events_tx.clone(),
        Box::new(CapsLockIndicator),
    ) {
        Ok(capture) => Arc::new(capture),
        Err(e) => {
            error!("Invalid hyper key: {e}");
            process::exit(1);
        }
    };

    let settings = config.settings.clone();
    let reactor_tx = events_tx.clone();
    let reactor_thread = thread::Builder::new().name("reactor".to_string()).spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("reactor: could not start runtime: {e:?}");
                return;
            }
        };
        let (border_tx, border_rx) = actor::channel();
        let timer = TokioTimer::new(runtime.handle().clone(), reactor_tx);
        let reactor = Reactor::new(
            MacWindowSystem::new(),
            settings,
            Box::new(timer),
            Some(border_tx),
        );
        runtime.spawn(border::log_requests(border_rx));
        runtime.block_on(reactor.run(events_rx));
        if let Some(main_loop) = CFRunLoop::main() {
            main_loop.stop();
        }
    });
    if let Err(e) = reactor_thread {
        error!("failed to spawn reactor thread: {e:?}");
        process::exit(1);
    }

    let tap_ctx = Arc::clone(&capture);
    let stop_capture = Arc::new(AtomicBool::new(false));
    let capture_stop = Arc::clone(&stop_capture);
    let capture_thread = thread::Builder::new().name("capture".to_string()).spawn(move || {
        info!("Keyboard capture starting");
        if !run_capture(tap_ctx, &capture_stop) {
            error!("Could not install the keyboard event tap; hotkeys are unavailable");
        }
    });
    let capture_thread = match capture_thread {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("failed to spawn capture thread: {e:?}");
            None
        }
    };

    ConfigWatcher::spawn(events_tx.clone(), capture, &config, config_path);

    let shutdown_tx = events_tx.clone();
    if let Err(e) = ctrlc::set_handler(move || shutdown_tx.send(reactor::Event::Shutdown)) {
        warn!("Could not install the interrupt handler: {e}");
    }

    let notification_center = NotificationCenter::new(events_tx);
    notification_center.send_initial_state(mtm);

    info!("hypertile running");
    CFRunLoop::run();

    drop(notification_center);
    stop_capture.store(true, Ordering::Release);
    if let Some(handle) = capture_thread
        && handle.join().is_err()
    {
        warn!("capture thread panicked");
    }
    if remapped {
        clear_caps_lock_remap();
    }
    info!("hypertile stopped");
}

#[cfg(not(target_os = "macos"))]
fn run(_config: Config, _config_path: PathBuf, _no_remap: bool) {
    eprintln!("hypertile only runs on macOS");
    process::exit(1);
}

#[cfg(panic = "unwind")]
fn install_panic_hook() {
    // Abort on panic instead of propagating panics to the main thread.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        original_hook(info);
        std::process::abort();
    }));
}

#[cfg(not(panic = "unwind"))]
fn install_panic_hook() {}
