use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use secrecy::Secret;
use tokio::fs::File;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tkscan::capture::{request_access, CaptureSession, LineDevice, PermissionState, Symbology};
use tkscan::config::Config;
use tkscan::error::AppError;
use tkscan::services::api_client::ApiClient;
use tkscan::services::credential_store::{CredentialStore, FileStore, MemoryStore};
use tkscan::services::scan_controller::{ConfirmOutcome, Phase, ScanController};
use tkscan::services::scan_result::Action;
use tkscan::services::session::{self, LoginError, Route, Session, UNKNOWN_SCANNER_ID};
use tkscan::services::ticket_payload::TicketPayload;
use tkscan::services::ticket_qr;
use tkscan::ui;
use tkscan::ui::result_sheet::SheetCommand;
use tkscan::ui::terminal::{is_quit_command, prompt_line, prompt_secret, Terminal};

#[derive(Parser)]
#[command(name = "tkscan", version, about = "Ticket scanner for event check-in")]
struct Cli {
    /// Keep credentials in memory for this run only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in as a scanning operator
    Login {
        #[arg(long, env = "TKSCAN_EMAIL")]
        email: Option<String>,
        #[arg(long, env = "TKSCAN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget stored credentials
    Logout,
    /// Show the stored operator identity
    Whoami,
    /// Scan tickets interactively
    Scan {
        /// Line-oriented scanner device (e.g. /dev/ttyACM0); defaults to the terminal
        #[arg(long)]
        device: Option<PathBuf>,
    },
    /// Verify a single ticket payload
    Check { payload: String },
    /// Check in a ticket, or one member of a group ticket
    Confirm {
        pass_id: String,
        #[arg(long)]
        member: Option<String>,
    },
    /// Render a ticket QR code for testing scanners
    Encode {
        #[arg(long)]
        pass_id: String,
        #[arg(long, default_value = "")]
        user_id: String,
        #[arg(long, default_value = "")]
        pass_type: String,
        #[arg(long, default_value = "")]
        token: String,
        /// Write an SVG file instead of printing to the terminal
        #[arg(long)]
        svg: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so screens on stdout stay readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tkscan=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::from_env().map_err(AppError::from)?;
    tracing::debug!(api_base_url = %config.api_base_url, "Configuration loaded");

    let store: Arc<dyn CredentialStore> = if cli.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::new(
            config.store_path.clone(),
            config.store_key.clone(),
        ))
    };

    let api = ApiClient::new(&config, store.clone()).map_err(AppError::from)?;

    match cli.command {
        Commands::Login { email, password } => {
            let session = interactive_login(&api, store.as_ref(), email, password).await?;
            println!("Logged in as {}", describe_operator(&session));
        }
        Commands::Logout => {
            session::logout(store.as_ref()).map_err(AppError::from)?;
            println!("Logged out");
        }
        Commands::Whoami => match session::startup_route(store.as_ref()) {
            Route::Login => println!("Not logged in"),
            Route::Scan => match Session::load(store.as_ref()).map_err(AppError::from)? {
                Some(session) => println!("Logged in as {}", describe_operator(&session)),
                None => println!("Not logged in"),
            },
        },
        Commands::Scan { device } => {
            run_scanner(&api, store.as_ref(), device.as_deref()).await?;
        }
        Commands::Check { payload } => {
            let scanner_id = stored_scanner_id(store.as_ref());
            let result = api.scan(&payload, &scanner_id).await;
            println!("{}", ui::result_sheet::render(&result).map_err(AppError::from)?);
        }
        Commands::Confirm { pass_id, member } => {
            let response = api.confirm_check_in(&pass_id, member.as_deref()).await;
            if !response.success {
                anyhow::bail!(response
                    .error
                    .unwrap_or_else(|| "Confirmation failed".to_string()));
            }
            println!("Checked in");
        }
        Commands::Encode {
            pass_id,
            user_id,
            pass_type,
            token,
            svg,
        } => {
            let payload = TicketPayload {
                pass_id,
                user_id,
                pass_type,
                token,
            };
            match svg {
                Some(path) => {
                    let rendered = ticket_qr::render_svg(&payload).map_err(AppError::from)?;
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => {
                    println!("{}", ticket_qr::render_terminal(&payload).map_err(AppError::from)?)
                }
            }
        }
    }

    Ok(())
}

fn describe_operator(session: &Session) -> String {
    match session.user() {
        Some(user) if !user.name.is_empty() => format!("{} <{}>", user.name, user.email),
        _ => session.scanner_id().to_string(),
    }
}

fn stored_scanner_id(store: &dyn CredentialStore) -> String {
    match Session::load(store) {
        Ok(Some(session)) => session.scanner_id().to_string(),
        Ok(None) => UNKNOWN_SCANNER_ID.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not read session");
            UNKNOWN_SCANNER_ID.to_string()
        }
    }
}

/// Runs before any [`Terminal`] reader starts, so prompts own stdin.
async fn interactive_login(
    api: &ApiClient,
    store: &dyn CredentialStore,
    email: Option<String>,
    password: Option<String>,
) -> Result<Session, AppError> {
    let interactive = email.is_none() || password.is_none();
    let mut error: Option<String> = None;

    loop {
        println!("{}", ui::login::render(error.as_deref())?);

        let email = match &email {
            Some(email) => email.clone(),
            None => match prompt_line("Email: ").await? {
                Some(line) => line.trim().to_string(),
                None => return Err(AppError::Unauthorized),
            },
        };
        let password = match &password {
            Some(password) => Secret::new(password.clone()),
            None => match prompt_secret("Password: ").await? {
                Some(secret) => secret,
                None => return Err(AppError::Unauthorized),
            },
        };

        match session::login(api, store, &email, &password).await {
            Ok(session) => return Ok(session),
            Err(LoginError::Storage(e)) => return Err(e.into()),
            Err(e @ LoginError::Identity(_)) => return Err(e.into()),
            Err(e) if interactive => error = Some(e.to_string()),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Opens the device, offering a retry while access is denied. `None` if the operator quits.
async fn open_device(
    path: &Path,
    terminal: &mut Terminal,
) -> Result<Option<LineDevice<BufReader<File>>>, AppError> {
    println!("{}", ui::scanner::render_permission(&PermissionState::Pending)?);

    loop {
        match request_access(path).await {
            Ok(device) => {
                println!("{}", ui::scanner::render_permission(&PermissionState::Granted)?);
                return Ok(Some(device));
            }
            Err(e) => {
                println!(
                    "{}",
                    ui::scanner::render_permission(&PermissionState::from(&e))?
                );
                match terminal.next_line().await {
                    Some(line) if line.trim() != "q" => continue,
                    _ => return Ok(None),
                }
            }
        }
    }
}

async fn run_scanner(
    api: &ApiClient,
    store: &dyn CredentialStore,
    device_path: Option<&Path>,
) -> Result<(), AppError> {
    // Session gate: no stored token means the login screen comes first
    let session = match session::startup_route(store) {
        Route::Scan => match Session::load(store)? {
            Some(session) => session,
            None => interactive_login(api, store, None, None).await?,
        },
        Route::Login => interactive_login(api, store, None, None).await?,
    };
    let operator = describe_operator(&session);

    let mut terminal = Terminal::spawn();

    let (capture, gate) = CaptureSession::new(Symbology::Qr);
    let mut controller = ScanController::new(api.clone(), session.scanner_id()).with_gate(gate);

    let (decode_tx, mut decodes) = mpsc::channel::<String>(16);
    let uses_device = match device_path {
        Some(path) => {
            let Some(mut device) = open_device(path, &mut terminal).await? else {
                return Ok(());
            };
            let device_capture = capture.clone();
            tokio::spawn(async move {
                loop {
                    match device_capture.next_code(&mut device).await {
                        Ok(Some(text)) => {
                            if decode_tx.send(text).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => {
                            tracing::warn!("Capture device closed");
                            break;
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Capture device read failed");
                            break;
                        }
                    }
                }
            });
            true
        }
        None => {
            drop(decode_tx);
            false
        }
    };

    println!("{}", ui::scanner::render(&operator, controller.phase())?);

    loop {
        let decoded = tokio::select! {
            Some(text) = decodes.recv() => Some(text),
            line = terminal.next_line() => {
                let Some(line) = line else { break };
                match controller.phase() {
                    Phase::Scanning if is_quit_command(&line) => break,
                    Phase::Scanning if uses_device => None,
                    Phase::Scanning => capture.accept(&line),
                    Phase::Verifying => None,
                    Phase::Showing => {
                        if !handle_sheet_input(&mut controller, &operator, &line).await? {
                            break;
                        }
                        terminal.discard_pending();
                        if controller.phase() == Phase::Scanning {
                            // Drop codes that queued up while the result was shown
                            while decodes.try_recv().is_ok() {}
                        }
                        None
                    }
                }
            }
        };

        if let Some(text) = decoded {
            println!("{}", ui::scanner::render(&operator, Phase::Verifying)?);
            if let Some(result) = controller.handle_decode(&text).await {
                println!("{}", ui::result_sheet::render(result)?);
            }
            // Input typed while verifying must not act on the new result
            terminal.discard_pending();
        }
    }

    Ok(())
}

/// Applies one operator command to the displayed result. Returns false to quit.
async fn handle_sheet_input(
    controller: &mut ScanController,
    operator: &str,
    line: &str,
) -> Result<bool, AppError> {
    let Some(result) = controller.result() else {
        return Ok(true);
    };

    let action = match ui::result_sheet::parse_command(result, line) {
        SheetCommand::Quit => return Ok(false),
        SheetCommand::Unknown => {
            println!("Unknown choice {:?}", line.trim());
            return Ok(true);
        }
        SheetCommand::Perform(action) => action,
    };

    match action {
        Action::Reset => {
            controller.reset();
            println!("{}", ui::scanner::render(operator, controller.phase())?);
        }
        Action::CheckIn => {
            println!("Checking in...");
            match controller.confirm().await {
                ConfirmOutcome::CheckedIn => {
                    println!("Checked in.");
                    println!("{}", ui::scanner::render(operator, controller.phase())?);
                }
                ConfirmOutcome::Failed(message) => println!("! Error: {}", message),
                ConfirmOutcome::MemberCheckedIn { .. } | ConfirmOutcome::NotAllowed => {}
            }
        }
        Action::CheckInMember { member_id } => {
            println!("Verifying member...");
            match controller.confirm_member(&member_id).await {
                ConfirmOutcome::MemberCheckedIn { .. } => {
                    if let Some(result) = controller.result() {
                        println!("{}", ui::result_sheet::render(result)?);
                    }
                }
                ConfirmOutcome::Failed(message) => println!("! Error: {}", message),
                ConfirmOutcome::CheckedIn | ConfirmOutcome::NotAllowed => {}
            }
        }
    }

    Ok(true)
}
