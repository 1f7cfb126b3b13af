//! `sitegate` - CLI for sitegate
//!
//! This binary provides the command-line interface for managing site records
//! and for reading and signing RAMS documents.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;

use sitegate::cli::{
    Cli, Command, ComplianceCommand, ConfigCommand, DeliveryCommand, NoticeCommand,
    NotificationCommand, OutputFormat, ProjectCommand, QualificationCommand, RamsCommand,
    UserCommand,
};
use sitegate::rams::{NewRamsDocument, Revision};
use sitegate::records::deliveries::{DeliveryRequest, NewDeliveryRequest};
use sitegate::records::notices::{NewSiteNotice, NoticeType, SiteNotice};
use sitegate::records::projects::{NewAssignment, NewProject, NewWorkLog, ProjectStatus};
use sitegate::records::qualifications::NewQualification;
use sitegate::records::users::{NewUser, UserUpdate};
use sitegate::scoring::ScoringWeights;
use sitegate::{init_logging, Config, ListFilter, LogEvents, Session, Site};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<sitegate::Error>() {
                Some(e) if e.is_user_error() => eprintln!("{}", e.user_message()),
                _ => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    // Configuration commands never touch the database.
    let command = match cli.command {
        Command::Config(config_cmd) => return handle_config(&config, config_cmd),
        other => other,
    };

    let site = Site::open(config).context("failed to open the site database")?;
    let _forwarder = site.events().subscribe().forward(LogEvents);
    let session = cli
        .acting_as
        .as_deref()
        .map(|email| site.session_for(email))
        .transpose()?;
    let session = session.as_ref();

    match command {
        Command::Status(status_cmd) => handle_status(&site, status_cmd.json),
        Command::Config(_) => Ok(()),
        Command::User(cmd) => handle_user(&site, session, cmd),
        Command::Project(cmd) => handle_project(&site, acting(session)?, cmd),
        Command::Rams(cmd) => handle_rams(&site, acting(session)?, cmd).await,
        Command::Compliance(cmd) => handle_compliance(&site, acting(session)?, cmd),
        Command::Delivery(cmd) => handle_delivery(&site, acting(session)?, cmd),
        Command::Notice(cmd) => handle_notice(&site, acting(session)?, cmd),
        Command::Notification(cmd) => handle_notification(&site, acting(session)?, cmd),
        Command::Qualification(cmd) => handle_qualification(&site, acting(session)?, cmd),
    }
}

fn acting(session: Option<&Session>) -> anyhow::Result<&Session> {
    session.ok_or_else(|| anyhow!("this command needs --as <EMAIL> to say who is acting"))
}

/// Resolve a user email to an id.
fn user_id(site: &Site, email: &str) -> anyhow::Result<i64> {
    let user = site
        .storage()
        .find_user_by_email(email)?
        .ok_or_else(|| sitegate::Error::UnknownUser {
            email: email.trim().to_lowercase(),
        })?;
    user.id
        .ok_or_else(|| anyhow!("stored user {email} has no id"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_status(site: &Site, json: bool) -> anyhow::Result<()> {
    let stats = site.stats()?;
    if json {
        let status = serde_json::json!({
            "database_path": site.storage().path(),
            "stats": stats,
        });
        return print_json(&status);
    }
    println!("sitegate status");
    println!("---------------");
    println!("Database:        {}", site.storage().path().display());
    println!("Size:            {} bytes", stats.db_size_bytes);
    println!("Users:           {}", stats.users);
    println!("Projects:        {}", stats.projects);
    println!("RAMS versions:   {}", stats.rams_documents);
    println!("Signatures:      {}", stats.signatures);
    println!("Outstanding:     {}", stats.outstanding_register_entries);
    println!("Deliveries:      {}", stats.deliveries);
    println!("Notices:         {}", stats.notices);
    println!("Notifications:   {}", stats.notifications);
    println!("Qualifications:  {}", stats.qualifications);
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                return print_json(config);
            }
            println!("Current Configuration");
            println!("=====================");
            println!();
            println!("[Storage]");
            println!("  Database path:      {}", config.database_path().display());
            println!();
            println!("[RAMS]");
            println!("  Tick interval (ms): {}", config.rams.tick_interval_ms);
            println!("  Require scroll:     {}", config.rams.require_scroll);
            println!("  Scroll threshold:   {}", config.rams.scroll_threshold);
            println!("  Allow skip:         {}", config.rams.allow_skip_to_minimum);
            println!("  Max signature:      {} bytes", config.rams.max_signature_bytes);
            println!();
            println!("[Compliance]");
            println!(
                "  Inactive entries:   {:?}",
                config.compliance.inactive_entries
            );
            println!();
            println!("[Qualifications]");
            println!(
                "  Warning (days):     {}",
                config.qualifications.expiry_warning_days
            );
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)).and_then(|c| c.validate()) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn handle_user(site: &Site, session: Option<&Session>, cmd: UserCommand) -> anyhow::Result<()> {
    match cmd {
        UserCommand::Add {
            email,
            name,
            role,
            phone,
            trade,
        } => {
            let input = NewUser {
                email,
                full_name: name,
                role: role.map(Into::into),
                phone,
                trade,
            };
            let user = match session {
                Some(session) => site.add_user(session, input)?,
                None if site.stats()?.users == 0 => site.bootstrap_admin(input)?,
                None => site.add_user(acting(session)?, input)?,
            };
            println!("Added {} <{}> as {}", user.full_name, user.email, user.role);
        }
        UserCommand::List {
            role,
            search,
            format,
        } => {
            let role = role.map(|r| sitegate::Role::from(r).to_string());
            let mut filter = ListFilter::new().facet_opt("role", role);
            if let Some(term) = search {
                filter = filter.search(term);
            }
            let users = site.list_users(&filter)?;
            if format == OutputFormat::Json {
                return print_json(&users);
            }
            for user in &users {
                println!(
                    "{:>4}  {:<30} {:<24} {:<10} {}",
                    user.id.unwrap_or_default(),
                    user.email,
                    user.full_name,
                    user.role,
                    user.status
                );
            }
        }
        UserCommand::Role { email, role } => {
            let session = acting(session)?;
            let id = user_id(site, &email)?;
            let update = UserUpdate {
                role: Some(role.into()),
                ..UserUpdate::default()
            };
            let user = site.update_user(session, id, update)?;
            println!("{} is now {}", user.email, user.role);
        }
        UserCommand::Deactivate { email } => {
            let user = site.set_user_active(acting(session)?, user_id(site, &email)?, false)?;
            println!("Deactivated {}", user.email);
        }
        UserCommand::Activate { email } => {
            let user = site.set_user_active(acting(session)?, user_id(site, &email)?, true)?;
            println!("Activated {}", user.email);
        }
    }
    Ok(())
}

fn handle_project(site: &Site, session: &Session, cmd: ProjectCommand) -> anyhow::Result<()> {
    match cmd {
        ProjectCommand::Add {
            code,
            name,
            location,
        } => {
            let project = site.add_project(
                session,
                NewProject {
                    code,
                    name,
                    location,
                },
            )?;
            println!(
                "Created project {} ({})",
                project.code,
                project.id.unwrap_or_default()
            );
        }
        ProjectCommand::List { status, format } => {
            let status = status.map(|s| ProjectStatus::from(s).to_string());
            let projects = site.list_projects(&ListFilter::new().facet_opt("status", status))?;
            if format == OutputFormat::Json {
                return print_json(&projects);
            }
            for project in &projects {
                println!(
                    "{:>4}  {:<10} {:<30} {}",
                    project.id.unwrap_or_default(),
                    project.code,
                    project.name,
                    project.status
                );
            }
        }
        ProjectCommand::SetStatus { id, status } => {
            let project = site.set_project_status(session, id, status.into())?;
            println!("{} is now {}", project.code, project.status);
        }
        ProjectCommand::Plot {
            project,
            number,
            house_type,
        } => match number {
            Some(number) => {
                let plot = site.add_plot(session, project, &number, house_type)?;
                println!(
                    "Added plot {} ({})",
                    plot.plot_number,
                    plot.id.unwrap_or_default()
                );
            }
            None => {
                for plot in site.list_plots(project)? {
                    println!(
                        "{:>4}  plot {:<6} {}",
                        plot.id.unwrap_or_default(),
                        plot.plot_number,
                        plot.house_type.unwrap_or_default()
                    );
                }
            }
        },
        ProjectCommand::Assign {
            plot,
            user,
            work_type,
            due,
        } => {
            let input = NewAssignment {
                plot_id: plot,
                user_id: user_id(site, &user)?,
                work_type,
                due_date: due,
            };
            let assignment = site.assign_work(session, input)?;
            println!(
                "Assignment {} created for {user}",
                assignment.id.unwrap_or_default()
            );
        }
        ProjectCommand::Assignments { user, format } => {
            let user = user.map(|email| user_id(site, &email)).transpose()?;
            let assignments = site.list_assignments(user, &ListFilter::new())?;
            if format == OutputFormat::Json {
                return print_json(&assignments);
            }
            for a in &assignments {
                println!(
                    "{:>4}  plot {:<5} user {:<5} {:<20} {}",
                    a.id.unwrap_or_default(),
                    a.plot_id,
                    a.user_id,
                    a.work_type,
                    a.status
                );
            }
        }
        ProjectCommand::Log {
            assignment,
            units,
            hours,
            notes,
            complete,
        } => {
            let log = site.log_work(
                session,
                NewWorkLog {
                    assignment_id: assignment,
                    units_completed: units,
                    hours_worked: hours,
                    notes,
                    completes_assignment: complete,
                },
            )?;
            println!(
                "Logged {} unit(s) of {} in {:.1}h",
                log.units_completed, log.work_type, log.hours_worked
            );
        }
        ProjectCommand::Leaderboard { work_type } => {
            for entry in site.leaderboard(work_type.as_deref())? {
                let email = site.user(entry.user_id).map(|u| u.email).unwrap_or_default();
                println!(
                    "{:>3}. {:<30} {:>6} units  {:>7.1}h",
                    entry.rank, email, entry.units_completed, entry.hours_worked
                );
            }
        }
        ProjectCommand::Suggest { work_type, limit } => {
            let ranked = site.suggest_operatives(session, &work_type, &ScoringWeights::default())?;
            for candidate in ranked.iter().take(limit) {
                let email = site
                    .user(candidate.user_id)
                    .map(|u| u.email)
                    .unwrap_or_default();
                let marker = if candidate.eligible { " " } else { "x" };
                println!(
                    "{marker} {:>5.1}  {:<30} {}",
                    candidate.score,
                    email,
                    candidate.reasons.join("; ")
                );
            }
        }
    }
    Ok(())
}

async fn handle_rams(site: &Site, session: &Session, cmd: RamsCommand) -> anyhow::Result<()> {
    match cmd {
        RamsCommand::Issue {
            reference,
            title,
            work_types,
            risk,
            min_read,
            file,
            keep_signatures,
        } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let document = site.issue_document(
                session,
                NewRamsDocument {
                    reference,
                    title,
                    work_types,
                    risk_level: risk.into(),
                    min_read_seconds: min_read,
                    content,
                    fresh_signature_required: !keep_signatures,
                },
            )?;
            println!("Issued {} v{}", document.reference, document.version);
        }
        RamsCommand::Revise {
            reference,
            file,
            title,
            work_types,
            risk,
            min_read,
            keep_signatures,
        } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let revision = Revision {
                content,
                title,
                work_types: (!work_types.is_empty()).then_some(work_types),
                risk_level: risk.map(Into::into),
                min_read_seconds: min_read,
                fresh_signature_required: keep_signatures.then_some(false),
            };
            let revised = site.revise_document(session, &reference, revision)?;
            let reopened = revised.reissued.iter().filter(|e| e.is_outstanding()).count();
            println!(
                "Issued {} v{}; {} register entr{} moved, {reopened} awaiting signature",
                revised.document.reference,
                revised.document.version,
                revised.reissued.len(),
                if revised.reissued.len() == 1 { "y" } else { "ies" },
            );
        }
        RamsCommand::List {
            all,
            search,
            format,
        } => {
            let mut filter = ListFilter::new();
            if let Some(term) = search {
                filter = filter.search(term);
            }
            let documents = site.list_documents(&filter, all)?;
            if format == OutputFormat::Json {
                return print_json(&documents);
            }
            for doc in &documents {
                let superseded = if doc.is_current() { "" } else { " (superseded)" };
                println!(
                    "{:<12} v{:<3} {:<8} {:>4}s  {}{superseded}",
                    doc.reference, doc.version, doc.risk_level, doc.min_read_seconds, doc.title
                );
            }
        }
        RamsCommand::Show { reference, json } => {
            let document = site.document(&reference)?;
            if json {
                return print_json(&document);
            }
            println!("{} v{}: {}", document.reference, document.version, document.title);
            println!("Risk:        {}", document.risk_level);
            println!("Work types:  {}", document.work_types.join(", "));
            println!("Minimum:     {}s", document.min_read_seconds);
            println!();
            println!("{}", document.content);
        }
        RamsCommand::Assign {
            reference,
            contractor,
            activity,
        } => {
            let contractor_id = user_id(site, &contractor)?;
            let entry = site.assign_rams(session, contractor_id, &reference, &activity)?;
            println!(
                "Register entry {} for {contractor}: {} ({})",
                entry.id.unwrap_or_default(),
                entry.activity,
                entry.status
            );
        }
        RamsCommand::Withdraw { entry } => {
            let entry = site.withdraw_rams(session, entry)?;
            println!("Register entry {} is now {}", entry.id.unwrap_or_default(), entry.status);
        }
        RamsCommand::Read {
            reference,
            signature,
            skip,
        } => read_and_sign(site, session, &reference, signature, skip).await?,
        RamsCommand::Signatures {
            contractor,
            reference,
            format,
        } => {
            let contractor = contractor.map(|email| user_id(site, &email)).transpose()?;
            let signatures = site.signatures(session, contractor, reference.as_deref())?;
            if format == OutputFormat::Json {
                return print_json(&signatures);
            }
            for s in &signatures {
                let skipped = if s.reading_skipped { " (timer skipped)" } else { "" };
                println!(
                    "{:>4}  {:<12} v{:<3} contractor {:<5} read {:>4}s  {}{skipped}",
                    s.id,
                    s.reference,
                    s.document_version,
                    s.contractor_id,
                    s.reading_seconds,
                    s.signed_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
    }
    Ok(())
}

/// Walk the acting user through reading and signing a document.
async fn read_and_sign(
    site: &Site,
    session: &Session,
    reference: &str,
    signature: Option<String>,
    skip: bool,
) -> anyhow::Result<()> {
    let mut reading = site.open_reading(session, reference)?;
    let document = reading.document().clone();
    println!("{} v{}: {}", document.reference, document.version, document.title);
    println!();
    println!("{}", document.content);
    println!();
    // The whole text has been printed.
    reading.with_gate(|gate| gate.record_scroll(1.0, 1.0));

    if skip {
        reading.with_gate(|gate| gate.skip_to_minimum())?;
    } else {
        site.start_reading_timer(&mut reading);
        loop {
            let gate = reading.snapshot();
            if gate.checkbox_enabled() {
                break;
            }
            let remaining = gate.remaining_seconds();
            if remaining % 10 == 0 || remaining <= 5 {
                eprintln!("Keep reading: {remaining}s remaining");
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
    reading.with_gate(|gate| gate.confirm_read())?;
    println!("Read and understood.");

    let signature = match signature {
        Some(signature) => signature,
        None => prompt("Type your full name to sign: ")?,
    };
    let stored = site.sign_reading(session, &mut reading, &signature)?;
    println!(
        "Signed {} v{} after {}s",
        stored.reference, stored.document_version, stored.reading_seconds
    );
    Ok(())
}

fn prompt(message: &str) -> anyhow::Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn handle_compliance(site: &Site, session: &Session, cmd: ComplianceCommand) -> anyhow::Result<()> {
    match cmd {
        ComplianceCommand::Status { contractor, json } => {
            let contractor_id = match contractor {
                Some(email) => user_id(site, &email)?,
                None => session.user_id(),
            };
            let status = site.compliance(session, contractor_id)?;
            if json {
                return print_json(&status);
            }
            println!(
                "{}% compliant: {} of {} signed, {} outstanding",
                status.compliance_percentage,
                status.signed_count,
                status.required_count,
                status.outstanding_count
            );
            if !status.blocked_activities.is_empty() {
                println!("Blocked: {}", status.blocked_activities.join(", "));
            }
        }
        ComplianceCommand::Gate {
            activity,
            contractor,
        } => {
            let contractor_id = match contractor {
                Some(email) => user_id(site, &email)?,
                None => session.user_id(),
            };
            site.gate_activity(session, contractor_id, &activity)?;
            println!("Clear to start {activity}");
        }
    }
    Ok(())
}

fn print_deliveries(deliveries: &[DeliveryRequest]) {
    for d in deliveries {
        println!(
            "{:>4}  {}  {:<11} {:<10} {:<20} {}",
            d.id.unwrap_or_default(),
            d.delivery_date,
            d.time_slot.as_deref().unwrap_or("-"),
            d.status,
            d.supplier,
            d.items
        );
    }
}

fn handle_delivery(site: &Site, session: &Session, cmd: DeliveryCommand) -> anyhow::Result<()> {
    let updated = match cmd {
        DeliveryCommand::Request {
            project,
            supplier,
            items,
            date,
            slot,
            notes,
        } => {
            let request = site.request_delivery(
                session,
                NewDeliveryRequest {
                    project_id: project,
                    supplier,
                    items,
                    delivery_date: date,
                    time_slot: slot,
                    notes,
                },
            )?;
            println!(
                "Delivery {} requested for {}",
                request.id.unwrap_or_default(),
                request.delivery_date
            );
            return Ok(());
        }
        DeliveryCommand::List {
            project,
            status,
            from,
            to,
            format,
        } => {
            let filter = ListFilter::new()
                .facet_opt("status", status)
                .facet_opt("project", project.map(|p| p.to_string()));
            let deliveries = match (from, to) {
                (Some(from), Some(to)) => site.delivery_calendar(from, to, &filter)?,
                _ => site.list_deliveries(project, &filter)?,
            };
            if format == OutputFormat::Json {
                return print_json(&deliveries);
            }
            print_deliveries(&deliveries);
            return Ok(());
        }
        DeliveryCommand::Approve { id } => site.approve_delivery(session, id)?,
        DeliveryCommand::Reject { id, reason } => site.reject_delivery(session, id, &reason)?,
        DeliveryCommand::Deliver { id, pod } => site.mark_delivered(session, id, pod)?,
        DeliveryCommand::Cancel { id } => site.cancel_delivery(session, id)?,
    };
    println!(
        "Delivery {} is now {}",
        updated.id.unwrap_or_default(),
        updated.status
    );
    Ok(())
}

fn print_notices(notices: &[SiteNotice]) {
    for n in notices {
        let scope = n
            .project_id
            .map_or_else(|| "site-wide".to_string(), |p| format!("project {p}"));
        println!(
            "{:>4}  [{}] {:<13} {}  ({scope})",
            n.id.unwrap_or_default(),
            n.priority,
            n.notice_type,
            n.title
        );
        println!("      {}", n.body);
    }
}

fn handle_notice(site: &Site, session: &Session, cmd: NoticeCommand) -> anyhow::Result<()> {
    match cmd {
        NoticeCommand::Post {
            title,
            body,
            notice_type,
            priority,
            project,
            expires_in_hours,
        } => {
            let notice = site.post_notice(
                session,
                NewSiteNotice {
                    project_id: project,
                    notice_type: notice_type.into(),
                    title,
                    body,
                    priority: priority.into(),
                    expires_at: expires_in_hours
                        .map(|h| Utc::now() + chrono::Duration::hours(i64::from(h))),
                },
            )?;
            println!("Posted notice {}", notice.id.unwrap_or_default());
        }
        NoticeCommand::List {
            project,
            all,
            notice_type,
            format,
        } => {
            let notice_type = notice_type.map(|t| NoticeType::from(t).to_string());
            let filter = ListFilter::new().facet_opt("type", notice_type);
            let notices = site.list_notices(project, !all, &filter)?;
            if format == OutputFormat::Json {
                return print_json(&notices);
            }
            print_notices(&notices);
        }
        NoticeCommand::Remove { id } => {
            site.remove_notice(session, id)?;
            println!("Removed notice {id}");
        }
    }
    Ok(())
}

fn handle_notification(
    site: &Site,
    session: &Session,
    cmd: NotificationCommand,
) -> anyhow::Result<()> {
    match cmd {
        NotificationCommand::List { unread, format } => {
            let feed = site.notifications(session, unread)?;
            if format == OutputFormat::Json {
                return print_json(&feed);
            }
            for n in &feed {
                let marker = if n.is_read() { " " } else { "*" };
                println!(
                    "{marker}{:>4}  {}  [{}] {}",
                    n.id.unwrap_or_default(),
                    n.created_at.format("%Y-%m-%d %H:%M"),
                    n.category,
                    n.title
                );
                println!("       {}", n.message);
            }
            println!("{} unread", site.unread_count(session)?);
        }
        NotificationCommand::Read { id } => {
            site.mark_read(session, id)?;
            println!("Marked {id} read");
        }
        NotificationCommand::ReadAll => {
            let changed = site.mark_all_read(session)?;
            println!("Marked {changed} notification(s) read");
        }
    }
    Ok(())
}

fn handle_qualification(
    site: &Site,
    session: &Session,
    cmd: QualificationCommand,
) -> anyhow::Result<()> {
    let today = Utc::now().date_naive();
    match cmd {
        QualificationCommand::Add {
            name,
            user,
            issuer,
            number,
            issued,
            expires,
        } => {
            let holder = match user {
                Some(email) => user_id(site, &email)?,
                None => session.user_id(),
            };
            let qualification = site.add_qualification(
                session,
                NewQualification {
                    user_id: holder,
                    name,
                    issuer,
                    certificate_number: number,
                    issued_on: issued,
                    expires_on: expires,
                    document_path: None,
                },
            )?;
            println!(
                "Recorded {} ({})",
                qualification.name,
                qualification.id.unwrap_or_default()
            );
        }
        QualificationCommand::List { user, format } => {
            let holder = user.map(|email| user_id(site, &email)).transpose()?;
            let views = site.qualifications(holder, today, &ListFilter::new())?;
            if format == OutputFormat::Json {
                return print_json(&views);
            }
            for v in &views {
                let q = &v.qualification;
                let expires = q
                    .expires_on
                    .map_or_else(|| "no expiry".to_string(), |d| d.to_string());
                println!(
                    "{:>4}  user {:<5} {:<30} {:<12} {}",
                    q.id.unwrap_or_default(),
                    q.user_id,
                    q.name,
                    expires,
                    v.status
                );
            }
        }
        QualificationCommand::Expiring { remind } => {
            for v in site.expiring_qualifications(today)? {
                let q = &v.qualification;
                println!(
                    "{:>4}  user {:<5} {:<30} {:>5} day(s)  {}",
                    q.id.unwrap_or_default(),
                    q.user_id,
                    q.name,
                    v.days_remaining.unwrap_or_default(),
                    v.status
                );
            }
            if remind {
                let sent = site.send_expiry_reminders(session, today)?;
                println!("Sent {sent} reminder(s)");
            }
        }
    }
    Ok(())
}
