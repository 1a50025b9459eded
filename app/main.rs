use std::{env::current_dir, path::Path, process::exit};

use clap::{error::ErrorKind, Parser, Subcommand};
use lib::{
    config::Config,
    error::{Error, Result},
    repository::Repository,
};

#[derive(Parser, Debug)]
#[command(name = "rev", about = "a small local revision control system")]
struct Arguments {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(about = "initialize a brand new repository in the working directory")]
    Init {
        #[arg(long, default_value = "master", help = "name of the first branch")]
        branch: String,
    },
    #[clap(about = "stage a file for the next commit")]
    Add { file: String },
    #[clap(about = "record the staged changes")]
    Commit {
        #[arg(help = "message to leave with this commit")]
        message: String,
    },
    #[clap(about = "unstage a file, or stage its removal")]
    Rm { file: String },
    #[clap(about = "show the current branch's history")]
    Log,
    #[clap(name = "global-log", about = "show every commit ever made")]
    GlobalLog,
    #[clap(about = "print the ids of commits with the given message")]
    Find { message: String },
    #[clap(about = "show branches, staged, removed, modified and untracked files")]
    Status,
    #[clap(about = "switch branches, or restore a file: `<branch>`, `-- <file>`, `<commit> -- <file>`")]
    Checkout {
        #[arg(help = "branch to switch to, or commit to restore the file from")]
        target: Option<String>,
        #[arg(last = true, help = "file to restore")]
        file: Option<String>,
    },
    #[clap(about = "create a branch at the current commit")]
    Branch { name: String },
    #[clap(name = "rm-branch", about = "delete a branch")]
    RmBranch { name: String },
    #[clap(about = "move the current branch to a commit and check it out")]
    Reset {
        #[arg(value_name = "COMMIT-ID")]
        id: String,
    },
    #[clap(about = "merge a branch into the current one (not supported)")]
    Merge { branch: String },
}

impl Command {
    fn run(self, cwd: &Path) -> Result<()> {
        use Command::*;
        match self {
            Init { branch } => init(cwd, branch),
            Add { file } => Repository::open(cwd)?.add(&file),
            Commit { message } => Repository::open(cwd)?.commit(&message).map(|_| ()),
            Rm { file } => Repository::open(cwd)?.remove(&file),
            Log => print_log(&Repository::open(cwd)?),
            GlobalLog => print_global_log(&Repository::open(cwd)?),
            Find { message } => print_found(&Repository::open(cwd)?, &message),
            Status => {
                print!("{}", Repository::open(cwd)?.status()?);
                Ok(())
            }
            Checkout { target, file } => checkout(&mut Repository::open(cwd)?, target, file),
            Branch { name } => Repository::open(cwd)?.branch(&name),
            RmBranch { name } => Repository::open(cwd)?.remove_branch(&name),
            Reset { id } => Repository::open(cwd)?.reset(&id),
            Merge { branch } => Repository::open(cwd)?.merge(&branch),
        }
    }
}

fn init(cwd: &Path, initial_branch: String) -> Result<()> {
    let config = Config {
        initial_branch,
        ..Config::default()
    };
    Repository::init(cwd, config).map(|_| ())
}

fn print_log(repo: &Repository) -> Result<()> {
    for entry in repo.log() {
        println!("{}", entry?);
    }
    Ok(())
}

fn print_global_log(repo: &Repository) -> Result<()> {
    for entry in repo.global_log()? {
        println!("{}", entry);
    }
    Ok(())
}

fn print_found(repo: &Repository, message: &str) -> Result<()> {
    for id in repo.find(message)? {
        println!("{}", id);
    }
    Ok(())
}

fn checkout(repo: &mut Repository, target: Option<String>, file: Option<String>) -> Result<()> {
    match (target, file) {
        (Some(branch), None) => repo.checkout_branch(&branch),
        (None, Some(file)) => repo.checkout_file(&file),
        (Some(id), Some(file)) => repo.checkout_file_at(&id, &file),
        (None, None) => Err(Error::validation()),
    }
}

fn main() {
    env_logger::init();
    let args = match Arguments::try_parse() {
        Ok(args) => args,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                println!("Please enter a command.");
                exit(0)
            }
            ErrorKind::InvalidSubcommand => {
                println!("No command with that name exists.");
                exit(0)
            }
            _ => {
                log::debug!("{}", err);
                println!("{}", Error::validation());
                exit(0)
            }
        },
    };
    log::debug!("{:?}", args);

    let result = current_dir()
        .map_err(Error::from)
        .and_then(|cwd| args.cmd.run(&cwd));
    match result {
        Ok(()) => {}
        // Ordinary failures are reported, not signalled through the exit code.
        Err(err) if err.is_user_facing() => println!("{}", err),
        Err(err) => {
            eprintln!("{}", err);
            exit(1)
        }
    }
}
