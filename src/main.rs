use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use xsd_resolve::{
    Cli, Command, ConfigManager, ElementTextCollector, ErrorReporter, Output, ParseReport,
    ParserOptions, ResolutionReport, ResolverError, SaxParser, SchemaEntityResolver,
    VerbosityLevel, XmlHandler,
};

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIG: u8 = 2;

fn init_logging(verbosity: VerbosityLevel) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_resolve(
    resolver: &SchemaEntityResolver,
    system_id: &str,
    public_id: Option<&str>,
    output: &Output,
) -> anyhow::Result<String> {
    let mut resolved = resolver
        .resolve(public_id, Some(system_id))
        .map_err(ResolverError::from)?;

    let mut data = Vec::new();
    resolved
        .stream
        .read_to_end(&mut data)
        .map_err(ResolverError::from)
        .with_context(|| format!("Failed to read resource {}", resolved.resource_name))?;

    Ok(output.format_resolution(&ResolutionReport {
        system_id: system_id.to_string(),
        resource_name: resolved.resource_name,
        size_bytes: data.len(),
    }))
}

fn run_parse(
    resolver: SchemaEntityResolver,
    command: &Command,
    output: &Output,
) -> anyhow::Result<String> {
    let Command::Parse {
        file,
        collect,
        no_schema_locations,
    } = command
    else {
        anyhow::bail!("Not a parse command");
    };

    let mut collector = ElementTextCollector::new(collect.iter().cloned());
    collector.set_entity_resolver(Some(Arc::new(resolver)));

    let parser = SaxParser::new(ParserOptions {
        resolve_schema_locations: !no_schema_locations,
        ..ParserOptions::default()
    });
    debug!("Parsing {} with {:?}", file.display(), parser.options());

    let outcome = parser
        .parse_file(file, &mut collector)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    Ok(output.format_parse(&ParseReport {
        file: file.display().to_string(),
        outcome,
        collected: collector.into_collected(),
    }))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    let requested = VerbosityLevel::from_flags(cli.verbose, cli.quiet);

    if let Err(e) = cli.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_CONFIG);
    }

    let config = match ConfigManager::load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            ErrorReporter::new(requested).report_config_error(&e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let verbosity = VerbosityLevel::from_flags(config.output.verbose, config.output.quiet);
    init_logging(verbosity);
    debug!("Using configuration {:?}", config);

    let reporter = ErrorReporter::new(verbosity);
    let output = Output::new(verbosity, config.output.format.into());

    let resolver = match config.schema_resolver() {
        Ok(resolver) => resolver,
        Err(e) => {
            reporter.report_config_error(&e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    debug!("Resolving schemas {}", resolver.config());

    let result = match &cli.command {
        Command::Resolve {
            system_id,
            public_id,
        } => run_resolve(&resolver, system_id, public_id.as_deref(), &output),
        parse @ Command::Parse { .. } => run_parse(resolver, parse, &output),
    };

    match result {
        Ok(text) => {
            println!("{}", text.trim_end());
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e.downcast_ref::<ResolverError>() {
                Some(error) => reporter.report_error(error),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
