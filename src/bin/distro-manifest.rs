use std::path::Path;

use anyhow::{bail, Context, Result};
use distro_manifest::distro::idparser::Parser;
use distro_manifest::request::{load_request, load_resolved};
use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;

fn usage() -> &'static str {
    "Usage:\n  distro-manifest parse-id <distro-id>\n  distro-manifest package-sets <request.toml>\n  distro-manifest containers <request.toml>\n  distro-manifest serialize <request.toml> <resolved.json>"
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [cmd, id] if cmd == "parse-id" => parse_id(id),
        [cmd, request] if cmd == "package-sets" => package_sets(Path::new(request)),
        [cmd, request] if cmd == "containers" => containers(Path::new(request)),
        [cmd, request, resolved] if cmd == "serialize" => {
            serialize(Path::new(request), Path::new(resolved))
        }
        _ => bail!(usage()),
    }
}

fn parse_id(id: &str) -> Result<()> {
    let parsed = Parser::default()
        .parse(id)
        .with_context(|| format!("parsing distro id '{id}'"))?;
    println!("{parsed}");
    Ok(())
}

fn package_sets(request: &Path) -> Result<()> {
    let manifest = load_request(request)?.build_manifest()?;
    let chains = manifest.get_package_set_chains();
    println!(
        "{}",
        serde_json::to_string_pretty(&chains).context("encoding package sets")?
    );
    Ok(())
}

fn containers(request: &Path) -> Result<()> {
    let manifest = load_request(request)?.build_manifest()?;
    let sources = manifest.get_container_source_specs();
    println!(
        "{}",
        serde_json::to_string_pretty(&sources).context("encoding container sources")?
    );
    Ok(())
}

fn serialize(request: &Path, resolved: &Path) -> Result<()> {
    let mut manifest = load_request(request)?.build_manifest()?;
    let resolved = load_resolved(resolved)?;
    resolved.check_against(&manifest)?;

    let out = manifest
        .serialize(&resolved.depsolved, &resolved.containers)
        .with_context(|| format!("serializing manifest for '{}'", request.display()))?;
    let json = serde_json::to_string_pretty(&out).context("encoding manifest")?;
    println!("{json}");

    let checkpoints = manifest.checkpoints();
    if !checkpoints.is_empty() {
        eprintln!("checkpoints: {}", checkpoints.join(", "));
    }
    let digest = format!("{:x}", Sha256::digest(json.as_bytes()));
    eprintln!("manifest digest: sha256:{digest}");
    Ok(())
}
