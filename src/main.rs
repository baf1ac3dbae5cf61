use clap::Parser;
use lookey::adapters::http::jwt;
use lookey::config::cli::{AllergyCommand, CartCommand, Command, ScanCommand, TokenCommand};
use lookey::core::{LocateOutcome, ScanMode};
use lookey::domain::model::DetectResult;
use lookey::domain::ports::TokenStore;
use lookey::utils::error::{ErrorSeverity, LookeyError, Result};
use lookey::utils::{logger, validation::Validate};
use lookey::{CliConfig, LocalFrameSource, LoginOutcome, LookeySession, OutputFormat};
use serde::Serialize;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::debug!("Output format: {:?}, paced: {}", config.output, config.paced);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(&config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(cli: &CliConfig) -> Result<()> {
    let session = LookeySession::new(cli.to_toml_config()?)?;
    let outcome = dispatch(cli, &session).await;
    session.close().await;
    outcome
}

async fn dispatch(cli: &CliConfig, session: &LookeySession) -> Result<()> {
    let output = cli.output;

    match &cli.command {
        Command::Login { id_token } => match session.auth.google_login(id_token).await? {
            LoginOutcome::ExistingUser(data) => {
                if output == OutputFormat::Text {
                    println!("✅ 로그인 성공 (user {:?})", data.user_id);
                    println!("LOOKEY_TOKEN={}", data.jwt_token);
                    if let Some(refresh) = &data.refresh_token {
                        println!("LOOKEY_REFRESH_TOKEN={}", refresh);
                    }
                } else {
                    print_records(output, &[data], |_| String::new())?;
                }
                Ok(())
            }
            LoginOutcome::NewUser => {
                println!("회원가입이 필요한 계정입니다.");
                Ok(())
            }
            LoginOutcome::Failed(message) => Err(LookeyError::UnauthorizedError { message }),
        },

        Command::Allergy { action } => {
            let allergies = &session.allergies;
            match action {
                AllergyCommand::List => allergies.load().await,
                AllergyCommand::Search { query } => allergies.search(Some(query.as_str())).await,
                AllergyCommand::Add { allergy_list_id } => allergies.add(*allergy_list_id).await,
                AllergyCommand::Remove { allergy_list_id } => {
                    allergies.delete(*allergy_list_id).await
                }
            }

            if let Some(message) = allergies.consume_message() {
                eprintln!("⚠️ {}", message);
            }
            let state = allergies.state();
            let records = match action {
                AllergyCommand::Search { .. } => state.suggestions,
                _ => state.my_allergies,
            };
            print_records(output, &records, |a| format!("{:>4}  {}", a.allergy_list_id, a.name))
        }

        Command::Cart { action } => {
            let cart = &session.cart;
            match action {
                CartCommand::List => {
                    let lines = cart.load().await?;
                    print_records(output, &lines, |line| {
                        format!(
                            "{:>4}  {}",
                            line.cart_id.map(|id| id.to_string()).unwrap_or_default(),
                            line.name.as_deref().unwrap_or("-")
                        )
                    })
                }
                CartCommand::Search { keyword } => {
                    let products = cart.search(keyword).await?;
                    print_records(output, &products, |p| {
                        format!("{:>4}  {}", p.product_id, p.product_name)
                    })
                }
                CartCommand::Add { product_id } => {
                    report_flag(cart.add(*product_id).await?, "장바구니에 담았습니다.");
                    Ok(())
                }
                CartCommand::Remove { cart_id } => {
                    report_flag(cart.remove(*cart_id).await?, "장바구니에서 삭제했습니다.");
                    Ok(())
                }
            }
        }

        Command::Stores { .. } => {
            let state = session.stores.find_nearby().await;
            if state.here.is_none() && session.config().location().is_none() {
                return Err(LookeyError::NoLocationError);
            }
            if let Some(error) = &state.error {
                eprintln!("⚠️ {}", error);
            }
            print_records(output, &state.stores, |s| {
                format!("{:>5}m  {} ({}, {})", s.distance_meters, s.name, s.lat, s.lng)
            })
        }

        Command::Scan { action } => run_scan(action, output, session).await,

        Command::Token {
            action: TokenCommand::Inspect,
        } => {
            let token = session
                .tokens()
                .access_token()
                .ok_or_else(|| LookeyError::UnauthorizedError {
                    message: "No access token configured".to_string(),
                })?;
            let payload = jwt::decode_jwt_payload(&token).ok_or_else(|| LookeyError::ValidationError {
                message: "Access token is not a JWT".to_string(),
            })?;
            let expires_at = jwt::jwt_expiry(&token);
            let expired = jwt::is_jwt_expired(&token, chrono::Utc::now());

            let report = serde_json::json!({
                "payload": payload,
                "expires_at": expires_at.map(|t| t.to_rfc3339()),
                "expired": expired,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn run_scan(action: &ScanCommand, output: OutputFormat, session: &LookeySession) -> Result<()> {
    match action {
        ScanCommand::Shelf { images, follow } => {
            if *follow {
                if let Err(e) = session.cart.load().await {
                    tracing::warn!("🛒 Cart unavailable, found products stay in the cart: {}", e);
                }
            }

            let scan = session.scan_session(frame_source(images).await?);
            let matched = scan.start_panorama().await?;
            if !*follow {
                return print_records(output, &matched, |name| name.clone());
            }

            let mut found = Vec::new();
            while scan.state().cart_guide_target.is_some() {
                match scan.confirm_cart_guide().await? {
                    LocateOutcome::Found(result) => found.push(result),
                    LocateOutcome::NotFound => scan.skip_cart_guide().await,
                    LocateOutcome::NoTarget => break,
                }
            }
            print_detections(output, &found)
        }

        ScanCommand::Locate { product, images } => {
            let scan = session.scan_session(frame_source(images).await?);
            match scan.locate_product(product.trim()).await? {
                LocateOutcome::Found(result) => print_detections(output, &[result]),
                _ => {
                    eprintln!("⚠️ {} 를 찾을 수 없습니다.", product);
                    Ok(())
                }
            }
        }

        ScanCommand::Guide { images } => {
            let frames = frame_source(images).await?;
            let polls = frames.len();
            let scan = session.scan_session(frames);
            scan.set_mode(ScanMode::Guide);

            let mut steps = Vec::new();
            for _ in 0..polls {
                if let Some(guidance) = scan.nav_guide_once().await {
                    steps.push(guidance);
                }
            }

            match output {
                OutputFormat::Text => {
                    for step in &steps {
                        println!("{}", step.summary.as_deref().unwrap_or("-"));
                        for action in &step.actions {
                            println!("  - {}", action);
                        }
                    }
                    Ok(())
                }
                // actions are a list, which CSV rows cannot hold
                _ => {
                    println!("{}", serde_json::to_string_pretty(&steps)?);
                    Ok(())
                }
            }
        }
    }
}

/// One directory of JPEGs, or the listed files in order.
async fn frame_source(images: &[PathBuf]) -> Result<LocalFrameSource> {
    if let [dir] = images {
        if dir.is_dir() {
            return LocalFrameSource::from_dir(dir).await;
        }
    }
    Ok(LocalFrameSource::new(images.to_vec()))
}

fn print_detections(output: OutputFormat, results: &[DetectResult]) -> Result<()> {
    print_records(output, results, |r| {
        let banner = lookey::core::formatter::to_banner(r);
        banner.text.replace('\n', " / ")
    })
}

fn report_flag(ok: bool, message: &str) {
    if ok {
        println!("✅ {}", message);
    } else {
        eprintln!("⚠️ 요청이 처리되지 않았습니다.");
    }
}

fn print_records<T: Serialize>(
    output: OutputFormat,
    records: &[T],
    text: impl Fn(&T) -> String,
) -> Result<()> {
    match output {
        OutputFormat::Text => {
            if records.is_empty() {
                println!("(없음)");
            }
            for record in records {
                println!("{}", text(record));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}
