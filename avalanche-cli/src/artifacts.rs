use std::io::{self, Error, ErrorKind};

use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "artifacts/shell/"]
#[prefix = "artifacts/shell/"]
struct Shell;

fn load_script(name: &str) -> io::Result<String> {
    let key = format!("artifacts/shell/{}", name);
    let f = Shell::get(&key).ok_or_else(|| {
        Error::new(
            ErrorKind::NotFound,
            format!("embedded script {} not found", key),
        )
    })?;
    let s = std::str::from_utf8(f.data.as_ref()).map_err(|e| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("failed to convert embed file to str {}", e),
        )
    })?;
    Ok(s.to_string())
}

/// Replaces every "{{KEY}}" placeholder.
/// Placeholders left unresolved are an error.
pub fn render(template: &str, vars: &[(&str, &str)]) -> io::Result<String> {
    let mut out = template.to_string();
    for (k, v) in vars {
        out = out.replace(&format!("{{{{{}}}}}", k), v);
    }
    if let Some(start) = out.find("{{") {
        let rest = &out[start..];
        let end = rest.find("}}").map(|i| i + 2).unwrap_or(rest.len());
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("unresolved placeholder {}", &rest[..end]),
        ));
    }
    Ok(out)
}

pub fn stop_node_sh(compose_file: &str, service: &str) -> io::Result<String> {
    render(
        &load_script("stop_node.sh")?,
        &[("COMPOSE_FILE", compose_file), ("SERVICE", service)],
    )
}

pub fn start_node_sh(compose_file: &str, service: &str) -> io::Result<String> {
    render(
        &load_script("start_node.sh")?,
        &[("COMPOSE_FILE", compose_file), ("SERVICE", service)],
    )
}

pub fn install_subnet_evm_sh(download_url: &str, vm_binary_path: &str) -> io::Result<String> {
    render(
        &load_script("install_subnet_evm.sh")?,
        &[
            ("DOWNLOAD_URL", download_url),
            ("VM_BINARY_PATH", vm_binary_path),
        ],
    )
}

/// RUST_LOG=debug cargo test --package avalanche-cli --lib -- artifacts::test_scripts --exact --show-output
#[test]
fn test_scripts() {
    let s = stop_node_sh("/tmp/compose.yml", "avalanchego").unwrap();
    assert!(s.contains("docker compose -f /tmp/compose.yml stop avalanchego"));

    let s = start_node_sh("/tmp/compose.yml", "avalanchego").unwrap();
    assert!(s.contains("docker compose -f /tmp/compose.yml start avalanchego"));

    let s = install_subnet_evm_sh("https://example.com/a.tar.gz", "/plugins/vm").unwrap();
    assert!(s.contains("busybox wget https://example.com/a.tar.gz"));
    assert!(s.contains("chmod 755 /plugins/vm"));

    let err = render("echo {{A}} {{B}}", &[("A", "x")]).unwrap_err();
    assert!(err.to_string().contains("{{B}}"));
}
