use clap::Parser;
use tabload::config::toml_config::TomlConfig;
use tabload::utils::error::{EtlError, ErrorSeverity};
use tabload::utils::logger;
use tabload::{CliConfig, EtlEngine, OriginReader, PipelineDefinition, SqliteSink, TablePipeline, Verifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose, cli.log_json);
    tracing::info!("Starting tabload");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let (config, definition) = match cli
        .load_pipeline_config()
        .and_then(|config| config.to_definition().map(|definition| (config, definition)))
    {
        Ok(loaded) => loaded,
        Err(e) => {
            report_error("Configuration failed", &e);
            std::process::exit(exit_code(e.severity()));
        }
    };

    if cli.dry_run {
        print_plan(&config, &definition);
        return Ok(());
    }

    let table = definition.table.clone();
    let sink = SqliteSink::new(config.database_path());
    let pipeline = TablePipeline::new(OriginReader::new(), sink.clone(), definition);
    let engine = EtlEngine::new(pipeline);

    let mut worst: Option<ErrorSeverity> = None;

    match engine.run().await {
        Ok(summary) => {
            println!(
                "✅ Loaded {} rows into '{}' ({} warnings)",
                summary.rows_loaded,
                summary.table,
                summary.warnings.len()
            );
        }
        Err(e) => {
            report_error("ETL process failed", &e);
            worst = Some(e.severity());
        }
    }

    // 不論管道結果如何都讀回資料表
    let verifier = Verifier::new(sink);
    match verifier.verify(&table).await {
        Ok(rendered) => {
            println!("\n--- Table '{}' ---", table);
            println!("{}", rendered);
        }
        Err(e) => {
            report_error("Verification failed", &e);
            worst = worst.max(Some(e.severity()));
        }
    }

    if let Some(severity) = worst {
        let code = exit_code(severity);
        if code > 0 {
            std::process::exit(code);
        }
    }

    Ok(())
}

fn report_error(context: &str, e: &EtlError) {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
}

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn print_plan(config: &TomlConfig, definition: &PipelineDefinition) {
    println!("📋 Pipeline: {}", definition.name);
    if let Some(description) = &config.pipeline.description {
        println!("  {}", description);
    }
    println!("  Source: {}", definition.origin);
    println!("  Target: {} -> table '{}'", config.load.database, definition.table);
    println!("  Preview rows: {}", definition.preview_rows);
    println!();
    println!("🔄 Fields:");
    for rule in &definition.fields {
        let mut line = format!("  {}", rule.output_name());
        if let Some(from) = &rule.from {
            line.push_str(&format!(" <- {}", from));
        } else if rule.rename.is_some() {
            line.push_str(&format!(" <- {}", rule.name));
        }
        if let Some(field_type) = rule.field_type {
            line.push_str(&format!(" ({})", field_type));
        }
        println!("{}", line);
    }
    println!();
    println!("🔍 Dry run complete, nothing was extracted or written.");
}
