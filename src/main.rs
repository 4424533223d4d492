//
// main.rs
//
// aspectran: rule-parsing and activity-dispatch core.
// Copyright (C) 2018 KOYAMA Hiro <tac@amris.co.jp>
//

use std::cell::RefCell;
use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use aspectran::activity::{
    ActivityContextBuilder, BasicRequestAdapter, BasicResponseAdapter, CoreActivity, ResponseAdapter,
};
use aspectran::env::ContextConfig;
use aspectran::error::ContextError;
use aspectran::parser::AspectranNodeParser;
use aspectran::parsing::RuleParsingContext;
use aspectran::rule::MethodType;

// =====================================================================
/// Reads an aspectran configuration document; lists its rules or runs
/// one translet and prints the response.
///
#[derive(Debug, Parser)]
#[command(name = "aspectran", version)]
struct Cli {
    /// Context configuration: APON, or JSON with a .json extension.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration document; overrides configFile of --config.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Validate the document against its DTD.
    #[arg(long)]
    validating: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Lists the rules the document declares, without resolving them.
    List,

    /// Runs a translet; parameters are given as name=value.
    Run {
        translet: String,

        #[arg(short, long, default_value = "GET")]
        method: String,

        params: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Application error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = match cli.config {
        Some(ref path) => ContextConfig::load(path)?,
        None => ContextConfig::default(),
    };
    if let Some(ref file) = cli.file {
        config.config_file = Some(file.display().to_string());
    }
    if cli.validating {
        config.validating = true;
    }
    debug!("{:?}", config);

    return match cli.command {
        Command::List => list_rules(&config),
        Command::Run { translet, method, params } => run_translet(config, &translet, &method, &params),
    };
}

// ---------------------------------------------------------------------
//
fn list_rules(config: &ContextConfig) -> Result<(), Box<dyn Error>> {
    let path = match config.config_file {
        Some(ref name) => config.resolve_path(name),
        None => return Err(ContextError::NoConfigFile.into()),
    };
    let context = Rc::new(RefCell::new(RuleParsingContext::shallow(config.base_path.clone())));
    AspectranNodeParser::new(Rc::clone(&context), config.validating, config.tracking_location)
            .parse_file(&path)?;

    let ctx = context.borrow();
    let rule_set = ctx.rule_set();
    for rule in rule_set.aspect_rules.iter() {
        println!("{}", rule);
    }
    for rule in rule_set.bean_rules.iter() {
        println!("{}", rule);
    }
    for rule in rule_set.schedule_rules.iter() {
        println!("{}", rule);
    }
    for rule in rule_set.template_rules.iter() {
        println!("{}", rule);
    }
    for rule in rule_set.translet_rules.iter() {
        println!("{}", rule);
    }
    return Ok(());
}

// ---------------------------------------------------------------------
//
fn run_translet(config: ContextConfig, translet: &str, method: &str, params: &[String])
        -> Result<(), Box<dyn Error>> {
    let method: MethodType = method.to_uppercase().parse()?;
    let mut request = BasicRequestAdapter::new(method);
    for param in params.iter() {
        match param.split_once('=') {
            Some((name, value)) => request.add_parameter(name, value),
            None => return Err(format!("Parameter must be name=value: {}", param).into()),
        }
    }

    let context = ActivityContextBuilder::new(config).build()?;
    let mut response = BasicResponseAdapter::new();
    let result = {
        let mut activity = CoreActivity::new(context.clone(), &mut request, &mut response);
        activity.prepare(translet).and_then(|_| activity.perform())
    };
    context.destroy();
    result?;

    if let Some(location) = response.redirected() {
        eprintln!("Redirect: {}", location);
    }
    if let Some(content_type) = response.content_type() {
        eprintln!("Content-Type: {}", content_type);
    }
    println!("{}", response.body());
    return Ok(());
}
