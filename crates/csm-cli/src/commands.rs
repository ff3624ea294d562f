use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use csm_service::{ContentService, DriverSelector, ServiceConfig};
use csm_store::shard::relative_path;
use csm_store::{DriverParam, ParamMap, ProgressCallback};
use csm_types::Progress;

use crate::cli::*;

/// Storage root of the configuration used when `--config` is absent.
pub const DEFAULT_ROOT: &str = "./resources";
/// URL prefix of the configuration used when `--config` is absent.
pub const DEFAULT_URL: &str = "/resources";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    if let Command::Shard(args) = &cli.command {
        return cmd_shard(args);
    }

    let mut service = build_service(cli.config.as_deref())?;
    let driver = cli.driver.clone();
    let selector = move || match &driver {
        Some(name) => DriverSelector::Named(name.clone()),
        None => DriverSelector::Default,
    };
    if cli.progress {
        attach_progress(&mut service, selector())?;
    }

    match cli.command {
        Command::Shard(_) => Ok(()),
        Command::Put(args) => cmd_put(&mut service, selector(), args),
        Command::Get(args) => cmd_get(&mut service, selector(), args),
        Command::Rm(args) => cmd_rm(&mut service, selector(), args),
        Command::Exists(args) => cmd_exists(&mut service, selector(), args),
        Command::Url(args) => cmd_url(&mut service, selector(), args),
        Command::Cp(args) => cmd_cp(&mut service, selector(), args),
    }
}

fn default_config() -> ServiceConfig {
    let mut main = ParamMap::new();
    main.insert("type".into(), "filesystem".into());
    main.insert("resource_path".into(), DEFAULT_ROOT.into());
    main.insert("resource_url".into(), DEFAULT_URL.into());
    main.insert("dir_mode".into(), "775".into());
    main.insert("file_mode".into(), "775".into());
    ServiceConfig::default().with_driver("main", main)
}

fn build_service(config: Option<&Path>) -> anyhow::Result<ContentService> {
    let config = match config {
        Some(path) => ServiceConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            fs::create_dir_all(DEFAULT_ROOT)
                .with_context(|| format!("creating {DEFAULT_ROOT}"))?;
            default_config()
        }
    };
    Ok(ContentService::new(config)?)
}

fn progress_printer(label: &'static str) -> ProgressCallback {
    Arc::new(move |p: &Progress| {
        eprint!(
            "\r{} {}/{} bytes ({:.0}%)",
            label.dimmed(),
            p.processed(),
            p.total_size(),
            p.fraction() * 100.0
        );
        if p.is_complete() {
            eprintln!();
        }
        true
    })
}

fn attach_progress(service: &mut ContentService, selector: DriverSelector) -> anyhow::Result<()> {
    let driver = service.driver(selector)?;
    driver.set_param(DriverParam::ReadEvent(Some(progress_printer("read"))))?;
    driver.set_param(DriverParam::WriteEvent(Some(progress_printer("write"))))?;
    Ok(())
}

fn cmd_shard(args: &ShardArgs) -> anyhow::Result<()> {
    args.ident.validate()?;
    println!("{}", relative_path(&args.ident));
    Ok(())
}

fn cmd_put(service: &mut ContentService, selector: DriverSelector, args: PutArgs) -> anyhow::Result<()> {
    let content = fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    if !service.set(selector, &args.ident, &content, &args.name)? {
        bail!("could not store {}", args.name);
    }
    println!(
        "{} Stored {} ({} bytes) at {}",
        "✓".green().bold(),
        args.name.bold(),
        content.len(),
        relative_path(&args.ident).cyan()
    );
    Ok(())
}

fn cmd_get(service: &mut ContentService, selector: DriverSelector, args: GetArgs) -> anyhow::Result<()> {
    let Some(content) = service.get(selector, &args.ident, &args.name)? else {
        bail!("could not read {}", args.name);
    };
    match &args.out {
        Some(path) => {
            fs::write(path, &content).with_context(|| format!("writing {}", path.display()))?;
            println!(
                "{} Wrote {} bytes to {}",
                "✓".green().bold(),
                content.len(),
                path.display().to_string().bold()
            );
        }
        None => std::io::stdout().write_all(&content)?,
    }
    Ok(())
}

fn cmd_rm(service: &mut ContentService, selector: DriverSelector, args: ObjectArgs) -> anyhow::Result<()> {
    if !service.delete(selector, &args.ident, &args.name)? {
        bail!("could not delete {}", args.name);
    }
    println!("{} Deleted {}", "✓".green(), args.name.bold());
    Ok(())
}

fn cmd_exists(service: &mut ContentService, selector: DriverSelector, args: ObjectArgs) -> anyhow::Result<()> {
    if service.exists(selector, &args.ident, &args.name)? {
        println!("{} {}", "yes".green(), args.name);
    } else {
        println!("{} {}", "no".red(), args.name);
    }
    Ok(())
}

fn cmd_url(service: &mut ContentService, selector: DriverSelector, args: ObjectArgs) -> anyhow::Result<()> {
    match service.resolve_prepared_url(selector, &args.ident, &args.name)? {
        Some(url) => println!("{}", url),
        None => bail!("no url for {}", args.name),
    }
    Ok(())
}

fn cmd_cp(service: &mut ContentService, selector: DriverSelector, args: CpArgs) -> anyhow::Result<()> {
    let dest_name = args.dest_name.as_deref();
    if !service.copy(selector, &args.ident, &args.dest, &args.name, dest_name)? {
        bail!("could not copy {}", args.name);
    }
    println!(
        "{} Copied {} → {}/{}",
        "✓".green(),
        args.name.bold(),
        relative_path(&args.dest).cyan(),
        dest_name.unwrap_or(&args.name).bold()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("csm").chain(args.iter().copied())).unwrap()
    }

    fn memory_config(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("csm.toml");
        fs::write(
            &path,
            "default_driver = \"mem\"\n\n[drivers.mem]\ntype = \"memory\"\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn default_config_names_main_filesystem() {
        let config = default_config();
        assert_eq!(config.default_driver, "main");
        let params = config.driver_params("main").unwrap();
        assert_eq!(params["type"], "filesystem");
        assert_eq!(params["dir_mode"], "775");
    }

    #[test]
    fn parses_global_flags_and_subcommand() {
        let cli = parse(&["--progress", "-d", "files", "cp", "d:a", "x.txt", "d:b", "--as", "y.txt"]);
        assert!(cli.progress);
        assert_eq!(cli.driver.as_deref(), Some("files"));
        let Command::Cp(args) = cli.command else {
            panic!("expected cp");
        };
        assert_eq!(args.dest_name.as_deref(), Some("y.txt"));
        assert_eq!(args.dest.segment_count(), 1);
    }

    #[test]
    fn invalid_ident_is_a_usage_error() {
        assert!(Cli::try_parse_from(["csm", "shard", "bogus"]).is_err());
    }

    #[test]
    fn put_get_rm_against_configured_driver() {
        let dir = tempfile::tempdir().unwrap();
        let config = memory_config(dir.path());
        let mut service = build_service(Some(config.as_path())).unwrap();
        let input = dir.path().join("in.bin");
        let output = dir.path().join("out.bin");
        fs::write(&input, b"cli payload").unwrap();

        let put = parse(&["put", "d:users,n:7", "a.bin", input.to_str().unwrap()]);
        let Command::Put(args) = put.command else { panic!("expected put") };
        cmd_put(&mut service, DriverSelector::Default, args).unwrap();

        let get = parse(&["get", "d:users,n:7", "a.bin", "--out", output.to_str().unwrap()]);
        let Command::Get(args) = get.command else { panic!("expected get") };
        cmd_get(&mut service, DriverSelector::Default, args).unwrap();
        assert_eq!(fs::read(&output).unwrap(), b"cli payload");

        let rm = parse(&["rm", "d:users,n:7", "a.bin"]);
        let Command::Rm(args) = rm.command else { panic!("expected rm") };
        cmd_rm(&mut service, DriverSelector::Default, args).unwrap();
        assert!(!service
            .exists(DriverSelector::Default, &crate::ident_arg::parse_ident("d:users,n:7").unwrap(), "a.bin")
            .unwrap());
    }

    #[test]
    fn progress_flag_attaches_callbacks() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = build_service(Some(memory_config(dir.path()).as_path())).unwrap();
        attach_progress(&mut service, DriverSelector::Default).unwrap();
        let params = service.driver(DriverSelector::Default).unwrap().params();
        assert_eq!(params["read_event"], true);
        assert_eq!(params["write_event"], true);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_service(Some(dir.path().join("nope.toml").as_path())).unwrap_err();
        assert!(err.to_string().contains("loading"));
    }
}
