use std::env;
use std::fs;
use std::process;

use anyhow::{Context, Result, bail};
use log::{LevelFilter, info};
use ssc::Compiler;
use ssc::config::CompileOptions;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Default)]
struct CliOptions {
    compile: CompileOptions,
    to_stdout: bool,
    check_only: bool,
    verbose: bool,
}

fn print_usage() {
    println!("ssc IR Generator v{}", VERSION);
    println!("Usage: sscc [options] <source_file> [output_file.ll]");
    println!();
    println!("Options:");
    println!("  --stdout              把 IR 输出到标准输出");
    println!("  --check               只检查源码，不写出 IR");
    println!("  --target <triple>     目标三元组 (默认: {})", ssc::config::DEFAULT_TARGET_TRIPLE);
    println!("  --module-name <name>  模块名 (默认: {})", ssc::config::DEFAULT_MODULE_NAME);
    println!("  --no-bind-params      定义函数时不把实参写入形参变量");
    println!("  -v, --verbose         输出调试日志");
    println!("  --version             显示版本号");
    println!("  --help, -h            显示帮助信息");
}

fn parse_args(args: &[String]) -> Result<(CliOptions, String, Option<String>)> {
    let mut options = CliOptions::default();
    let mut input_file: Option<String> = None;
    let mut output_file: Option<String> = None;
    let mut i = 1;

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--version" => {
                println!("ssc IR Generator v{}", VERSION);
                process::exit(0);
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            "-v" | "--verbose" => options.verbose = true,
            "--stdout" => options.to_stdout = true,
            "--check" => options.check_only = true,
            "--no-bind-params" => options.compile.bind_parameters = false,
            "--target" | "--module-name" => {
                i += 1;
                let value = args
                    .get(i)
                    .with_context(|| format!("{} 需要一个参数", arg))?
                    .clone();
                if arg == "--target" {
                    options.compile.target_triple = value;
                } else {
                    options.compile.module_name = value;
                }
            }
            _ => {
                if arg.starts_with('-') {
                    bail!("未知选项: {}", arg);
                }
                if input_file.is_none() {
                    input_file = Some(arg.clone());
                } else if output_file.is_none() {
                    output_file = Some(arg.clone());
                } else {
                    bail!("多余参数: {}", arg);
                }
            }
        }
        i += 1;
    }

    let input_file = input_file.context("需要指定输入文件")?;
    Ok((options, input_file, output_file))
}

fn default_output(input_file: &str) -> String {
    match input_file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{}.ll", stem),
        _ => format!("{}.ll", input_file),
    }
}

fn run(args: &[String]) -> Result<()> {
    let (options, source_path, output_path) = parse_args(args)?;

    let level = if options.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let source = fs::read_to_string(&source_path)
        .with_context(|| format!("无法读取源文件 '{}'", source_path))?;

    let compiler = Compiler::with_options(options.compile);
    let ir = compiler
        .compile_to_ir(&source)
        .with_context(|| format!("编译 '{}' 失败", source_path))?;

    if options.check_only {
        info!("{}: ok", source_path);
        return Ok(());
    }
    if options.to_stdout {
        print!("{}", ir);
        return Ok(());
    }

    let output_path = output_path.unwrap_or_else(|| default_output(&source_path));
    fs::write(&output_path, &ir).with_context(|| format!("无法写入 '{}'", output_path))?;
    println!("Generated: {} ({:.1} KB)", output_path, ir.len() as f64 / 1024.0);
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&args) {
        eprintln!("错误: {:#}", e);
        process::exit(1);
    }
}
