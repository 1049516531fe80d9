use clap::Parser;
use flow_lang::config::{self, FsConfig};
use flow_lang::error::{self, FlowError};
use flow_lang::sandbox::Sandbox;
use flow_lang::{builtins, compiler, interpreter, lexer, parser, vm};
use std::path::PathBuf;
use std::process::ExitCode;

/// A lexer, parser, compiler, and stack-based virtual machine for the
/// Flow scripting language.
#[derive(Parser, Debug)]
#[command(name = "flow")]
#[command(version = config::VERSION)]
#[command(about = "Run a Flow script")]
struct CliArgs {
    /// Script file to execute.
    #[arg(value_name = "FILE")]
    script: PathBuf,

    /// Run with the tree-walking interpreter instead of the bytecode VM.
    #[arg(long = "tree-walk")]
    tree_walk: bool,

    /// Add an allowed filesystem path for read_file/write_file (repeatable).
    #[arg(long = "fs-sandbox", value_name = "PATH", action = clap::ArgAction::Append)]
    fs_paths: Vec<PathBuf>,

    /// Maximum file size in bytes for read_file/write_file.
    #[arg(long = "max-file-size", value_name = "BYTES", default_value = "10485760")]
    max_file_size: usize,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Err(err) = run(&args) {
        eprintln!("flow: {}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(args: &CliArgs) -> Result<(), FlowError> {
    let fs_config = build_fs_config(args);
    let allowed: Vec<String> = fs_config
        .allowed_paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    let sandbox = Sandbox::new(allowed, fs_config.max_file_size)
        .map_err(|e| error::RuntimeError::io("sandbox init", e.to_string()))?;
    builtins::set_sandbox_storage(sandbox);

    let source = std::fs::read_to_string(&args.script).map_err(|e| {
        error::RuntimeError::io("read script", format!("{}: {}", args.script.display(), e))
    })?;

    let tokens = lexer::tokenize(&source)?;
    let ast = parser::parse(tokens)?;

    if args.tree_walk {
        let mut interp = interpreter::Interpreter::new();
        interp.run(&ast)?;
    } else {
        let code = compiler::compile(&ast)?;
        let mut machine = vm::Vm::new();
        machine.run(code)?;
    }
    Ok(())
}

fn build_fs_config(args: &CliArgs) -> FsConfig {
    let allowed_paths = if args.fs_paths.is_empty() {
        FsConfig::default().allowed_paths
    } else {
        args.fs_paths.clone()
    };
    FsConfig {
        allowed_paths,
        max_file_size: args.max_file_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_fs_config_falls_back_to_defaults() {
        let args = CliArgs {
            script: PathBuf::from("x.flow"),
            tree_walk: false,
            fs_paths: vec![],
            max_file_size: 10_485_760,
        };
        let cfg = build_fs_config(&args);
        assert_eq!(cfg.allowed_paths, FsConfig::default().allowed_paths);
    }

    #[test]
    fn build_fs_config_honors_custom_paths() {
        let args = CliArgs {
            script: PathBuf::from("x.flow"),
            tree_walk: false,
            fs_paths: vec![PathBuf::from("/tmp/safe")],
            max_file_size: 4096,
        };
        let cfg = build_fs_config(&args);
        assert_eq!(cfg.allowed_paths, vec![PathBuf::from("/tmp/safe")]);
        assert_eq!(cfg.max_file_size, 4096);
    }
}
