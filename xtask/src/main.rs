use anyhow::{bail, Context, Result};
use clap::Parser;
use std::{fs, path::Path, process::Command};

const EBPF_PACKAGE: &str = "execscope-ebpf";
const USER_PACKAGE: &str = "execscope";

/// Kernel types the probe reads through BTF-generated bindings
const KERNEL_TYPES: &[&str] = &["task_struct"];
const VMLINUX_BINDINGS: &str = "execscope-ebpf/src/vmlinux.rs";

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Parser)]
enum Cmd {
    /// Generate kernel type bindings from the running kernel's BTF (needs aya-tool)
    Codegen,
    /// Build the kernel probe
    BuildEbpf {
        #[arg(long, default_value = "bpfel-unknown-none")]
        target: String,
        #[arg(long)]
        release: bool,
    },
    /// Build the probe and the tracer, then run the tracer as root
    Run {
        #[arg(long, default_value = "bpfel-unknown-none")]
        target: String,
        /// Arguments passed through to execscope
        #[arg(last = true)]
        run_args: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Cmd::Codegen => codegen()?,
        Cmd::BuildEbpf { target, release: _ } => build_ebpf(&target)?,
        Cmd::Run { target, run_args } => {
            build_ebpf(&target)?;
            run(&run_args)?;
        }
    }

    Ok(())
}

fn codegen() -> Result<()> {
    let output = Command::new("aya-tool")
        .arg("generate")
        .args(KERNEL_TYPES)
        .output()
        .context("Failed to run aya-tool (cargo install --git https://github.com/aya-rs/aya -- aya-tool)")?;

    if !output.status.success() {
        bail!("aya-tool failed: {}", String::from_utf8_lossy(&output.stderr));
    }

    fs::write(VMLINUX_BINDINGS, &output.stdout)
        .with_context(|| format!("Failed to write {VMLINUX_BINDINGS}"))?;

    println!("✓ Generated {VMLINUX_BINDINGS} ({})", KERNEL_TYPES.join(", "));
    Ok(())
}

fn build_ebpf(target: &str) -> Result<()> {
    if !Path::new(VMLINUX_BINDINGS).exists() {
        codegen()?;
    }

    // Debug builds of the probe pull in formatting code (LowerHex) the BPF
    // linker rejects, so the probe is always built in release mode.
    let status = Command::new("cargo")
        .args(["+nightly", "build", "--package", EBPF_PACKAGE, "--target", target])
        .args(["-Z", "build-std=core", "--release"])
        .status()
        .context("Failed to build eBPF program")?;

    if !status.success() {
        bail!("Failed to build eBPF program");
    }

    println!("✓ eBPF program built successfully");
    println!("  Target: {target}");
    println!("  Profile: release (always)");

    Ok(())
}

fn run(run_args: &[String]) -> Result<()> {
    let status = Command::new("cargo")
        .args(["build", "--release", "--package", USER_PACKAGE])
        .status()
        .context("Failed to build execscope")?;
    if !status.success() {
        bail!("Failed to build execscope");
    }

    let status = Command::new("sudo")
        .arg("-E")
        .arg(format!("target/release/{USER_PACKAGE}"))
        .args(run_args)
        .status()
        .context("Failed to run execscope")?;
    if !status.success() {
        bail!("execscope exited with {status}");
    }
    Ok(())
}
