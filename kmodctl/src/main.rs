//! kmodctl - load the bundled modules in-process
//!
//! Commands:
//! - `kmodctl insmod <module> [name=value]...` - Bind parameters, init, print, unload
//! - `kmodctl modinfo <module>` - Show the `.modinfo` entries of a module
//! - `kmodctl list` - List the bundled modules

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;
use hello::{Hello1, Hello2, Hello5};
use kmod::{Module, parameq};
use kmod_loader::{LoaderConfig, ModuleLoader, UnknownParamPolicy};
use std::fmt::Write;

#[derive(Parser)]
#[command(name = "kmodctl")]
#[command(version)]
#[command(about = "Load example modules with insmod-style parameters", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a module, print its visible parameters and unload it
    Insmod {
        /// Fail the load on parameters the module does not declare
        #[arg(long)]
        strict: bool,

        /// Module name, e.g. hello-5
        module: String,

        /// Parameters as name=value; a bare `--` ends them
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        params: Vec<String>,
    },

    /// Show the modinfo entries of a module
    Modinfo {
        /// Module name, e.g. hello-5
        module: String,
    },

    /// List the bundled modules
    List,
}

const MODULES: &[&str] = &["hello_1", "hello_2", "hello_5"];

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    print!("{}", execute(cli.command)?);
    Ok(())
}

/// Run one command and return what it prints.
fn execute(command: Commands) -> anyhow::Result<String> {
    match command {
        Commands::Insmod {
            module,
            params,
            strict,
        } => {
            let config = LoaderConfig {
                unknown: if strict {
                    UnknownParamPolicy::Reject
                } else {
                    UnknownParamPolicy::Ignore
                },
            };
            dispatch(&module, Action::Insmod { params, config })
        }

        Commands::Modinfo { module } => dispatch(&module, Action::Modinfo),

        Commands::List => Ok(MODULES.iter().map(|name| format!("{}\n", name)).collect()),
    }
}

enum Action {
    Insmod {
        params: Vec<String>,
        config: LoaderConfig,
    },
    Modinfo,
}

/// Module names match the way parameter names do, so `hello-5` finds `hello_5`.
fn dispatch(module: &str, action: Action) -> anyhow::Result<String> {
    if parameq(module, "hello_1") {
        run::<Hello1>(action)
    } else if parameq(module, "hello_2") {
        run::<Hello2>(action)
    } else if parameq(module, "hello_5") {
        run::<Hello5>(action)
    } else {
        anyhow::bail!(
            "module '{}' not found (available: {})",
            module,
            MODULES.join(", ")
        )
    }
}

fn run<M: Module>(action: Action) -> anyhow::Result<String> {
    let loader = ModuleLoader::<M>::new()
        .with_context(|| format!("declaring parameters of {}", M::info().name()))?;

    let mut out = String::new();
    match action {
        Action::Modinfo => {
            write!(out, "{}", loader.info())?;
        }

        Action::Insmod { params, config } => {
            let loader = loader.with_config(config);
            let name = loader.info().name().to_string();
            let owner = loader
                .load_module_tokens(params.iter().map(String::as_str))
                .with_context(|| format!("insmod {}", name))?;

            if !owner.warnings().is_empty() {
                log::debug!("{} argument(s) ignored", owner.warnings().len());
            }

            writeln!(out, "/sys/module/{}/parameters:", owner.name())?;
            for (spec, shown) in owner.params().visible() {
                writeln!(out, "  {:<16} {}  {}", spec.name(), spec.permissions(), shown)?;
            }

            owner.unload();
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> String {
        let cli = Cli::try_parse_from(args).unwrap();
        execute(cli.command).unwrap()
    }

    #[test]
    fn test_insmod_stops_at_dashes() {
        let out = cli(&["kmodctl", "insmod", "hello-5", "myint=1", "--", "myint=2"]);
        assert!(out.contains("  myint            rw-r--r--  1\n"), "{out}");
        assert!(!out.contains("rw-r--r--  2"), "{out}");
    }

    #[test]
    fn test_insmod_params() {
        let out = cli(&["kmodctl", "insmod", "hello_5", "mylong=-7", "myshort=3"]);
        assert_eq!(
            out,
            "/sys/module/hello_5/parameters:\n\
             \x20 myshort          rw-rw----  3\n\
             \x20 myint            rw-r--r--  420\n\
             \x20 mylong           r--------  -7\n"
        );
    }

    #[test]
    fn test_insmod_strict() {
        let cli_args =
            Cli::try_parse_from(["kmodctl", "-v", "insmod", "--strict", "hello-5", "bogus=1"])
                .unwrap();
        assert!(cli_args.verbose);
        assert!(execute(cli_args.command).is_err());
        assert!(cli(&["kmodctl", "insmod", "hello-5", "bogus=1"]).contains("myint"));
    }

    #[test]
    fn test_unknown_module() {
        let cli_args = Cli::try_parse_from(["kmodctl", "modinfo", "hello-3"]).unwrap();
        let err = execute(cli_args.command).unwrap_err();
        assert!(err.to_string().contains("hello_1, hello_2, hello_5"));
    }

    #[test]
    fn test_modinfo_and_list() {
        let out = cli(&["kmodctl", "modinfo", "hello-5"]);
        assert!(out.starts_with("name:           hello_5\n"), "{out}");
        assert!(out.contains("parmtype:       myintArray:array of int\n"), "{out}");
        assert_eq!(cli(&["kmodctl", "list"]), "hello_1\nhello_2\nhello_5\n");
    }
}
