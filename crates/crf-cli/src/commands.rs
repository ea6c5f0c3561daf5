use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{CellAlignment, ContentArrangement, Table};
use tracing::debug;

use crf_lifecycle::ReportService;
use crf_model::template::FieldDef;
use crf_model::value::{FieldKind, FieldValue, ValueMap};
use crf_store::{StoreState, load_state, save_state};
use crf_templates::TemplateRegistry;

use crate::cli::{
    ArtifactArgs, CheckArgs, Cli, Command, PublishArgs, RegisterArgs, ReturnArgs, SetArgs,
    WorkItemArgs,
};

/// Dispatch the parsed command. Mutating commands persist the state file
/// on success; read-only commands never touch it.
pub fn run(cli: &Cli) -> Result<()> {
    let registry = Arc::new(
        TemplateRegistry::load_dir(&cli.templates_dir).with_context(|| {
            format!("load templates from {}", cli.templates_dir.display())
        })?,
    );
    debug!(
        templates = registry.len(),
        dir = %cli.templates_dir.display(),
        "template registry loaded"
    );

    let service = ReportService::from_state(
        Arc::clone(&registry),
        load_or_default(&cli.state_file)?,
    )?;

    match &cli.command {
        Command::Templates => run_templates(&registry),
        Command::Register(args) => {
            run_register(&service, args)?;
            persist(&service, &cli.state_file)
        }
        Command::Show(args) => run_show(&service, args),
        Command::Set(args) => {
            run_set(&service, args)?;
            persist(&service, &cli.state_file)
        }
        Command::Submit(args) => {
            service.submit(&args.work_item)?;
            println!("{} submitted for review", args.work_item);
            persist(&service, &cli.state_file)
        }
        Command::Verify(args) => {
            service.verify(&args.work_item)?;
            println!("{} verified", args.work_item);
            persist(&service, &cli.state_file)
        }
        Command::Return(args) => {
            run_return(&service, args)?;
            persist(&service, &cli.state_file)
        }
        Command::Publish(args) => {
            run_publish(&service, args)?;
            persist(&service, &cli.state_file)
        }
        Command::History(args) => run_history(&service, args),
        Command::Check(args) => run_check(&service, args),
        Command::Artifact(args) => run_artifact(&service, args),
    }
}

fn load_or_default(path: &Path) -> Result<StoreState> {
    if path.exists() {
        Ok(load_state(path).with_context(|| format!("load state from {}", path.display()))?)
    } else {
        debug!(path = %path.display(), "no state file, starting empty");
        Ok(StoreState::new())
    }
}

fn persist(service: &ReportService, path: &Path) -> Result<()> {
    save_state(&service.to_state(), path)
        .with_context(|| format!("save state to {}", path.display()))
}

fn run_templates(registry: &TemplateRegistry) -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Code", "Schema", "Fields", "Rules"]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for code in registry.codes() {
        // codes() only yields registered templates
        if let Some(template) = registry.get(code) {
            table.add_row(vec![
                template.code.clone(),
                template.schema_version.to_string(),
                template.fields.len().to_string(),
                template.ui.rules.len().to_string(),
            ]);
        }
    }
    println!("{table}");
    Ok(())
}

fn run_register(service: &ReportService, args: &RegisterArgs) -> Result<()> {
    service.register_work_item(&args.work_item, &args.template)?;
    println!("{} registered with template {}", args.work_item, args.template);
    Ok(())
}

fn run_show(service: &ReportService, args: &WorkItemArgs) -> Result<()> {
    let state = service.get_values(&args.work_item)?;
    let template = service.get_schema(&args.work_item)?;
    let hidden = crf_rules::evaluate(&template.ui.rules, &state.values)?;

    println!("Work item: {}", args.work_item);
    println!("Template:  {} (schema v{})", template.code, template.schema_version);
    println!("Status:    {}", state.status);
    println!("Published: {}", if state.is_published { "yes" } else { "no" });

    let mut table = Table::new();
    table.set_header(vec!["Field", "Label", "Value", "Visible"]);
    apply_table_style(&mut table);
    for field in &template.fields {
        let value = state
            .values
            .get(&field.key)
            .cloned()
            .unwrap_or(FieldValue::Absent);
        let visible = !hidden.contains(&field.key);
        table.add_row(vec![
            field.key.clone(),
            field.label.clone(),
            value.to_string(),
            if visible { "yes" } else { "hidden" }.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn run_set(service: &ReportService, args: &SetArgs) -> Result<()> {
    let template = service.get_schema(&args.work_item)?;
    let mut values: ValueMap = service.get_values(&args.work_item)?.values;

    for assignment in &args.assignments {
        let Some((key, raw)) = assignment.split_once('=') else {
            bail!("invalid assignment {assignment:?}: expected key=value");
        };
        let Some(field) = template.field(key) else {
            bail!("template {} has no field {key:?}", template.code);
        };
        if raw.is_empty() {
            values.remove(key);
        } else {
            values.insert(key.to_string(), parse_value(field, raw)?);
        }
    }

    service.save(&args.work_item, values)?;
    println!("{}: {} assignment(s) saved", args.work_item, args.assignments.len());
    Ok(())
}

/// Parse a raw CLI string into the field's declared kind.
fn parse_value(field: &FieldDef, raw: &str) -> Result<FieldValue> {
    match field.kind {
        FieldKind::Text => Ok(FieldValue::text(raw)),
        FieldKind::Bool => match raw {
            "true" => Ok(FieldValue::Bool(true)),
            "false" => Ok(FieldValue::Bool(false)),
            other => bail!("field {:?} is bool, expected true or false, got {other:?}", field.key),
        },
        FieldKind::Number => {
            let number: f64 = raw
                .parse()
                .with_context(|| format!("field {:?} is number, got {raw:?}", field.key))?;
            if !number.is_finite() {
                bail!("field {:?} must be a finite number", field.key);
            }
            Ok(FieldValue::Number(number))
        }
        FieldKind::Choice => {
            if !field.options.iter().any(|o| o == raw) {
                bail!(
                    "field {:?} accepts one of {:?}, got {raw:?}",
                    field.key,
                    field.options
                );
            }
            Ok(FieldValue::choice(raw))
        }
    }
}

fn run_return(service: &ReportService, args: &ReturnArgs) -> Result<()> {
    service.return_for_correction(&args.work_item, &args.reason, &args.actor)?;
    println!("{} returned for correction", args.work_item);
    Ok(())
}

fn run_publish(service: &ReportService, args: &PublishArgs) -> Result<()> {
    let version = service.publish(&args.work_item, &args.notes, &args.confirm, &args.actor)?;
    println!("{} published as version {version}", args.work_item);
    Ok(())
}

fn run_history(service: &ReportService, args: &WorkItemArgs) -> Result<()> {
    let history = service.get_publish_history(&args.work_item)?;
    if history.is_empty() {
        println!("{} has no published versions", args.work_item);
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Version", "Published at", "By", "Notes", "Checksum"]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for meta in history {
        table.add_row(vec![
            meta.version.to_string(),
            meta.published_at.to_rfc3339(),
            meta.published_by.clone(),
            meta.notes.clone(),
            short_checksum(&meta.checksum),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn run_check(service: &ReportService, args: &CheckArgs) -> Result<()> {
    let report = service.check_integrity(&args.work_item, args.version)?;
    if report.matches {
        println!(
            "{} version {}: checksum OK ({})",
            args.work_item,
            args.version,
            short_checksum(&report.stored_checksum)
        );
        Ok(())
    } else {
        println!("{} version {}: CHECKSUM MISMATCH", args.work_item, args.version);
        println!("  stored:   {}", report.stored_checksum);
        println!("  computed: {}", report.computed_checksum);
        bail!("integrity check failed");
    }
}

fn run_artifact(service: &ReportService, args: &ArtifactArgs) -> Result<()> {
    let bytes = service.get_published_artifact(&args.work_item, args.version)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("write artifact to {}", path.display()))?;
            println!("artifact written to {}", path.display());
        }
        None => {
            let text = String::from_utf8_lossy(&bytes);
            print!("{text}");
        }
    }
    Ok(())
}

fn short_checksum(hex: &str) -> String {
    hex.chars().take(12).collect()
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
