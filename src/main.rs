use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as CliParser;
use slang_bindgen::{BindingGenerator, Result, system_frontend};

/// Generate Slang bindings for C headers.
#[derive(CliParser, Debug)]
#[clap(name = "slang-bindgen", about = "Generate Slang bindings from C headers")]
struct Cli {
    /// C headers to translate
    #[clap(value_name = "HEADER", required = true)]
    headers: Vec<String>,

    /// Wrap all declarations in a namespace
    #[clap(long, value_name = "NAME")]
    namespace: Option<String>,

    /// Slang module to import
    #[clap(long = "import", value_name = "MODULE", action = clap::ArgAction::Append)]
    imports: Vec<String>,

    /// Namespace to bring into scope with `using`
    #[clap(long = "using", value_name = "NAMESPACE", action = clap::ArgAction::Append)]
    usings: Vec<String>,

    /// Header whose declarations are provided by an imported module
    #[clap(long, value_name = "HEADER", action = clap::ArgAction::Append)]
    imported: Vec<PathBuf>,

    /// Preprocessor macro definitions
    #[clap(short = 'D', long = "define", value_name = "NAME[=VALUE]", action = clap::ArgAction::Append)]
    defines: Vec<String>,

    /// Include search paths
    #[clap(short = 'I', long = "include-dir", value_name = "DIR", action = clap::ArgAction::Append)]
    include_dirs: Vec<PathBuf>,

    /// Target triple to parse the headers for
    #[clap(long, value_name = "TRIPLE")]
    target_triple: Option<String>,

    /// Output file; standard output when absent
    #[clap(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enums to mark `[UnscopedEnum]` (default: all)
    #[clap(long, value_name = "REGEX", action = clap::ArgAction::Append)]
    unscoped_enums: Vec<String>,

    /// Pattern to remove from the common prefix of enum cases
    #[clap(long, value_name = "REGEX", action = clap::ArgAction::Append)]
    rm_enum_prefix: Vec<String>,

    /// Enum cases to drop
    #[clap(long, value_name = "REGEX", action = clap::ArgAction::Append)]
    rm_enum_case: Vec<String>,

    /// Prefix for enum cases that would start with a digit
    #[clap(long, value_name = "PREFIX", default_value = "e")]
    fallback_prefix: String,

    /// Translate `bool` as `uint8_t`
    #[clap(long)]
    use_byte_bool: bool,

    /// Log skipped and synthesized declarations
    #[clap(short, long)]
    verbose: bool,
}

impl Cli {
    fn generator(&self) -> BindingGenerator {
        let mut generator = BindingGenerator::new();
        for header in &self.headers {
            generator.header(header);
        }
        for header in &self.imported {
            generator.imported(header);
        }
        for module in &self.imports {
            generator.import(module);
        }
        for namespace in &self.usings {
            generator.using(namespace);
        }
        if let Some(namespace) = &self.namespace {
            generator.namespace(namespace);
        }
        for define in &self.defines {
            generator.define(define);
        }
        for dir in &self.include_dirs {
            generator.include(dir);
        }
        if let Some(target) = &self.target_triple {
            generator.target(target);
        }
        for pattern in &self.unscoped_enums {
            generator.unscoped_enum(pattern);
        }
        for pattern in &self.rm_enum_prefix {
            generator.remove_enum_prefix(pattern);
        }
        for pattern in &self.rm_enum_case {
            generator.remove_enum_case(pattern);
        }
        generator
            .fallback_prefix(&self.fallback_prefix)
            .byte_bool(self.use_byte_bool);
        generator
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let generator = cli.generator();
    let mut frontend = system_frontend()?;
    match &cli.output {
        Some(path) => generator.generate_to_file(frontend.as_mut(), path),
        None => generator.write_to(frontend.as_mut(), io::stdout().lock()),
    }
}
