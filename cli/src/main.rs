#[macro_use]
extern crate log;

use std::ffi::OsString;
use std::process::ExitCode;

use clap::{Arg, ArgMatches, Command};
use infra::config::LOG;
use infra::{StageRegistry, StageRunner};
use itertools::Itertools;

use crate::errors::*;

mod errors;
mod run;

fn app() -> Command<'static> {
    let command = || {
        Arg::new("command")
            .required(true)
            .multiple_values(true)
            .allow_invalid_utf8(true)
            .last(true)
            .help("Program to run, with its arguments, after --")
    };
    Command::new("stagediff")
        .version(clap::crate_version!())
        .about("Run programs under the stages of the compilation pipeline")
        .subcommand_required(true)
        .arg(
            Arg::new("verbosity")
                .short('v')
                .multiple_occurrences(true)
                .global(true)
                .help("Sets the level of verbosity."),
        )
        .subcommand(Command::new("stages").about("List the stages and their environment"))
        .subcommand(
            Command::new("run")
                .about("Run a program with the environment of one stage")
                .arg(
                    Arg::new("stage")
                        .long("stage")
                        .takes_value(true)
                        .required(true)
                        .help("Stage name"),
                )
                .arg(command()),
        )
        .subcommand(
            Command::new("bisect")
                .about("Run a program under every stage, report the first one failing")
                .arg(command()),
        )
}

fn main() -> ExitCode {
    let matches = app().get_matches();

    let level = match matches.occurrences_of("verbosity") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().filter_or(LOG, level);
    env_logger::Builder::from_env(env).format_timestamp_nanos().init();

    match handle(&matches) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:?}");
            ExitCode::from(1)
        }
    }
}

fn runner(matches: &ArgMatches) -> CliResult<StageRunner> {
    let mut command: Vec<OsString> = matches
        .values_of_os("command")
        .context("Missing command")?
        .map(|s| s.to_owned())
        .collect();
    ensure!(!command.is_empty(), "Missing command");
    let program = command.remove(0);
    Ok(StageRunner::new(program, command).with_passthrough(run::passthrough_from_env()))
}

fn handle(matches: &ArgMatches) -> CliResult<ExitCode> {
    let registry = StageRegistry::builtin();
    match matches.subcommand() {
        Some(("stages", _)) => {
            for stage in registry.stages() {
                println!("{}", stage.name);
                for (k, v) in stage.env_vars {
                    println!("    {k}={v}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(("run", m)) => {
            let name = m.value_of("stage").context("Missing stage")?;
            let stage = registry.by_name(name).with_context(|| {
                let names = registry.names().iter().join(", ");
                format!("Unknown stage {name:?}, expected one of {names}")
            })?;
            run::handle_run(&runner(m)?, stage)
        }
        Some(("bisect", m)) => run::handle_bisect(&runner(m)?, &registry),
        Some((s, _)) => bail!("Unknown subcommand {}.", s),
        None => bail!("No subcommand"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run() -> CliResult<()> {
        let args = ["stagediff", "-vv", "run", "--stage", "prim", "--", "sh", "-c", "true"];
        let matches = app().try_get_matches_from(args)?;
        assert_eq!(matches.occurrences_of("verbosity"), 2);
        let (name, m) = matches.subcommand().context("no subcommand")?;
        assert_eq!(name, "run");
        assert_eq!(m.value_of("stage"), Some("prim"));
        let runner = runner(m)?;
        let cmd = runner.command(StageRegistry::builtin().by_name("prim").context("prim")?);
        assert_eq!(cmd.get_program(), "sh");
        assert_eq!(cmd.get_args().collect::<Vec<_>>(), ["-c", "true"]);
        Ok(())
    }

    #[test]
    fn run_needs_a_command() {
        assert!(app().try_get_matches_from(["stagediff", "run", "--stage", "prim"]).is_err());
    }
}
