//! `carecode` - CLI for the access-code and document-sharing core
//!
//! This binary provides the command-line interface for issuing, extending,
//! revoking, and validating access codes over a local document store.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;

use carecode::cli::{
    Cli, Command, ConfigCommand, DocumentsCommand, ExtendCommand, IssueCommand, ListCommand,
    OutputFormat, RevokeCommand, SeedCommand, ValidateCommand,
};
use carecode::code::deterministic_code;
use carecode::ratelimit::AttemptLimiter;
use carecode::share::IssueOptions;
use carecode::store::{DirectiveRecord, MedicalFileRecord, PdfRecord};
use carecode::{
    init_logging, Aggregator, Config, PermanentIdentity, PersonalInfo, ShareableDocument,
    SharingService, Store, Validator,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Config commands don't need a store
    if let Command::Config(config_cmd) = cli.command {
        return handle_config(&config, config_cmd);
    }

    let store = Store::open(config.database_path())?;

    match cli.command {
        Command::Issue(cmd) => handle_issue(&config, &store, &cmd),
        Command::Validate(cmd) => handle_validate(&config, &store, &cmd),
        Command::Extend(cmd) => handle_extend(&config, &store, &cmd),
        Command::Revoke(cmd) => handle_revoke(&config, &store, &cmd),
        Command::List(cmd) => handle_list(&store, &cmd),
        Command::Documents(cmd) => handle_documents(&store, &cmd),
        Command::Seed(cmd) => handle_seed(&store, &cmd),
        Command::Config(_) => unreachable!("handled above"),
    }
}

fn handle_issue(config: &Config, store: &Store, cmd: &IssueCommand) -> anyhow::Result<()> {
    let service = SharingService::new(config.sharing.clone());
    let options = IssueOptions {
        expires_in_days: cmd.days,
        access_scope: cmd.scope.into(),
    };

    let grant = service
        .issue(store, &cmd.owner_id, &options)
        .with_context(|| format!("failed to issue a code for {}", cmd.owner_id))?;

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&grant)?),
        _ => {
            println!("Code:     {}", grant.code);
            println!("Owner:    {}", grant.owner_id);
            println!("Scope:    {}", grant.access_scope);
            println!("Expires:  {}", grant.expires_at.to_rfc3339());
            println!("Bundle:   {} document(s)", grant.snapshot.len());
        }
    }
    Ok(())
}

fn handle_validate(config: &Config, store: &Store, cmd: &ValidateCommand) -> anyhow::Result<()> {
    let personal = match (&cmd.first, &cmd.last) {
        (Some(first), Some(last)) => Some(PersonalInfo {
            first_name: first.clone(),
            last_name: last.clone(),
            birth_date: cmd
                .birth
                .as_deref()
                .map(|b| {
                    NaiveDate::parse_from_str(b, "%Y-%m-%d")
                        .with_context(|| format!("invalid birth date: {b}"))
                })
                .transpose()?,
        }),
        _ => None,
    };

    let limiter = AttemptLimiter::new(config.validation.limiter_config());
    let mut validator = Validator::new(config.validation.clone(), limiter);

    let documents = validator.validate(store, &cmd.code, personal.as_ref(), "cli")?;
    print_documents(&documents, cmd.format)?;
    Ok(())
}

fn handle_extend(config: &Config, store: &Store, cmd: &ExtendCommand) -> anyhow::Result<()> {
    let service = SharingService::new(config.sharing.clone());
    let new_expiry = service.extend(store, &cmd.code, cmd.days)?;
    println!(
        "Extended {} until {}",
        carecode::code::normalize_presented(&cmd.code),
        new_expiry.to_rfc3339()
    );
    Ok(())
}

fn handle_revoke(config: &Config, store: &Store, cmd: &RevokeCommand) -> anyhow::Result<()> {
    let service = SharingService::new(config.sharing.clone());
    service.revoke(store, &cmd.code)?;
    println!("Revoked {}", carecode::code::normalize_presented(&cmd.code));
    Ok(())
}

fn handle_list(store: &Store, cmd: &ListCommand) -> anyhow::Result<()> {
    let now = chrono::Utc::now();
    let grants: Vec<_> = store
        .list_grants(&cmd.owner_id)?
        .into_iter()
        .filter(|g| cmd.all || g.is_redeemable_at(now))
        .collect();

    if let OutputFormat::Json = cmd.format {
        println!("{}", serde_json::to_string_pretty(&grants)?);
        return Ok(());
    }

    if grants.is_empty() {
        println!("No grants for {}", cmd.owner_id);
        return Ok(());
    }

    println!("{:<10} {:<12} {:<26} {}", "CODE", "SCOPE", "EXPIRES", "STATE");
    for grant in grants {
        let state = if !grant.active {
            "revoked"
        } else if grant.is_expired_at(now) {
            "expired"
        } else {
            "active"
        };
        println!(
            "{:<10} {:<12} {:<26} {}",
            grant.code,
            grant.access_scope.to_string(),
            grant.expires_at.to_rfc3339(),
            state
        );
    }
    Ok(())
}

fn handle_documents(store: &Store, cmd: &DocumentsCommand) -> anyhow::Result<()> {
    let documents = Aggregator::new().aggregate(store, &cmd.owner_id)?;
    print_documents(&documents, cmd.format)?;
    Ok(())
}

fn handle_seed(store: &Store, cmd: &SeedCommand) -> anyhow::Result<()> {
    let birth_date = NaiveDate::parse_from_str(&cmd.birth, "%Y-%m-%d")
        .with_context(|| format!("invalid birth date: {}", cmd.birth))?;

    let identity = PermanentIdentity {
        owner_id: cmd.owner_id.clone(),
        first_name: cmd.first.clone(),
        last_name: cmd.last.clone(),
        birth_date,
    };
    store.put_identity(&identity)?;

    if cmd.with_documents {
        seed_sample_documents(store, &cmd.owner_id)?;
        println!("Inserted sample documents for {}", cmd.owner_id);
    }

    println!("Registered {} {}", identity.first_name, identity.last_name);
    println!("Permanent code: {}", deterministic_code(&identity.owner_id));
    Ok(())
}

fn seed_sample_documents(store: &Store, owner_id: &str) -> anyhow::Result<()> {
    let now = chrono::Utc::now();
    store.insert_directive(&DirectiveRecord {
        id: format!("{owner_id}-directive-1"),
        owner_id: Some(owner_id.to_string()),
        title: Some("Living will".to_string()),
        description: Some("Sample advance directive".to_string()),
        content_json: r#"{"resuscitation":"decline","organ_donation":"accept"}"#.to_string(),
        is_private: Some(false),
        created_at: now,
        updated_at: None,
    })?;
    store.insert_pdf_document(&PdfRecord {
        id: format!("{owner_id}-pdf-1"),
        owner_id: Some(owner_id.to_string()),
        file_name: Some("power-of-attorney.pdf".to_string()),
        description: None,
        content_type: None,
        storage_ref: format!("sample/{owner_id}/power-of-attorney.pdf"),
        is_private: None,
        created_at: now,
        updated_at: None,
    })?;
    store.insert_medical_file(&MedicalFileRecord {
        id: format!("{owner_id}-medical-1"),
        owner_id: Some(owner_id.to_string()),
        file_name: Some("allergy-list.pdf".to_string()),
        category: Some("allergies".to_string()),
        storage_ref: format!("sample/{owner_id}/allergy-list.pdf"),
        created_at: now,
    })?;
    Ok(())
}

fn print_documents(documents: &[ShareableDocument], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(documents)?),
        OutputFormat::Plain => {
            for doc in documents {
                println!("{} [{}] {}", doc.id, doc.kind, doc.display_name);
            }
        }
        OutputFormat::Table => {
            if documents.is_empty() {
                println!("No documents.");
                return Ok(());
            }
            println!("{:<16} {:<10} {:<32} {}", "ID", "KIND", "NAME", "CREATED");
            for doc in documents {
                println!(
                    "{:<16} {:<10} {:<32} {}",
                    doc.id,
                    doc.kind.to_string(),
                    doc.display_name,
                    doc.created_at.format("%Y-%m-%d")
                );
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:       {}", config.database_path().display());
                println!();
                println!("[Sharing]");
                println!("  Code length:         {}", config.sharing.code_length);
                println!(
                    "  Default expiry:      {} day(s)",
                    config.sharing.default_expiry_days
                );
                println!(
                    "  Max expiry:          {} day(s)",
                    config.sharing.max_expiry_days
                );
                println!();
                println!("[Validation]");
                println!(
                    "  Corroborate global:  {}",
                    config.validation.corroborate_global
                );
                println!(
                    "  Corroborate inst.:   {}",
                    config.validation.corroborate_institution
                );
                println!(
                    "  Corroborate personal:{}",
                    config.validation.corroborate_personal
                );
                println!(
                    "  Rate limit:          {} failure(s) / {} s",
                    config.validation.max_failed_attempts, config.validation.attempt_window_secs
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
