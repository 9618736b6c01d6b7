//! One-way upgrades of the data directory, run before every command.
use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use crate::{
    app::Avalanche,
    constants,
    models::{sidecar, Sidecar, VmType},
};

pub const RUN_MESSAGE: &str = "The data directory layout changed, migrating...";
pub const END_MESSAGE: &str = "Migration completed";
pub const FAILED_END_MESSAGE: &str =
    "Migration failed, the data directory may be partially migrated";

/// Returns true if it changed anything on disk.
pub type Migration = fn(&Avalanche) -> io::Result<bool>;

/// Runs migrations in order.
/// The run message is written once the first migration reports a change,
/// the end (or failure) message only if something ran.
pub struct Runner<W: Write> {
    migrations: Vec<Migration>,
    out: W,
    running: bool,
}

impl<W: Write> Runner<W> {
    pub fn new(migrations: Vec<Migration>, out: W) -> Self {
        Self {
            migrations,
            out,
            running: false,
        }
    }

    pub fn run(&mut self, app: &Avalanche) -> io::Result<()> {
        for (idx, m) in self.migrations.iter().enumerate() {
            match m(app) {
                Ok(changed) => {
                    if changed {
                        log::info!("migration {} applied", idx);
                        if !self.running {
                            self.running = true;
                            writeln!(self.out, "{}", RUN_MESSAGE)?;
                        }
                    }
                }
                Err(e) => {
                    log::warn!("migration {} failed ({})", idx, e);
                    if self.running {
                        writeln!(self.out, "{}", FAILED_END_MESSAGE)?;
                    }
                    return Err(e);
                }
            }
        }
        if self.running {
            writeln!(self.out, "{}", END_MESSAGE)?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Every migration, in the order they must run.
pub fn all() -> Vec<Migration> {
    vec![migrate_top_level_files as Migration, migrate_subnet_evm_names]
}

/// Runs every migration, reporting to stdout.
pub fn run_migrations(app: &Avalanche) -> io::Result<()> {
    Runner::new(all(), io::stdout()).run(app)
}

/// Moves "<base>/<name>_sidecar.json" and "<base>/<name>_genesis.json"
/// into "<base>/subnets/<name>/".
pub fn migrate_top_level_files(app: &Avalanche) -> io::Result<bool> {
    let base_dir = app.get_base_dir();
    if !Path::new(&base_dir).exists() {
        return Ok(false);
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(&base_dir)? {
        entries.push(entry?);
    }

    let mut changed = false;
    for entry in entries {
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        let (name, target) =
            if let Some(name) = file_name.strip_suffix(constants::LEGACY_SIDECAR_SUFFIX) {
                (name.to_string(), app.get_sidecar_path(name))
            } else if let Some(name) = file_name.strip_suffix(constants::LEGACY_GENESIS_SUFFIX) {
                (name.to_string(), app.get_genesis_path(name))
            } else {
                continue;
            };

        fs::create_dir_all(app.get_blockchain_dir(&name))?;
        log::info!("moving '{}' to '{}'", entry.path().display(), target);
        fs::rename(entry.path(), &target)?;
        changed = true;
    }
    Ok(changed)
}

/// Renames the legacy "SubnetEVM" VM name to "Subnet-EVM".
pub fn migrate_subnet_evm_names(app: &Avalanche) -> io::Result<bool> {
    let subnet_dir = app.get_subnet_dir();
    if !Path::new(&subnet_dir).exists() {
        return Ok(false);
    }

    let mut changed = false;
    for entry in fs::read_dir(&subnet_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !app.sidecar_exists(&name) {
            // e.g., leftovers of an interrupted create
            continue;
        }
        let mut sc: Sidecar = app.load_sidecar(&name)?;
        if sc.vm == VmType::Other(sidecar::LEGACY_SUBNET_EVM.to_string()) {
            sc.vm = VmType::SubnetEvm;
            app.update_sidecar(&mut sc)?;
            changed = true;
        }
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use std::io::{Error, ErrorKind};

    use super::*;

    fn new_app() -> (tempfile::TempDir, Avalanche) {
        let tmp_dir = tempfile::tempdir().unwrap();
        let app = Avalanche::new(tmp_dir.path().to_str().unwrap());
        app.setup().unwrap();
        (tmp_dir, app)
    }

    fn applied(_: &Avalanche) -> io::Result<bool> {
        Ok(true)
    }
    fn noop(_: &Avalanche) -> io::Result<bool> {
        Ok(false)
    }
    fn fails(_: &Avalanche) -> io::Result<bool> {
        Err(Error::new(ErrorKind::Other, "bogus fail"))
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- app::migrations::tests::test_runner_messages --exact --show-output
    #[test]
    fn test_runner_messages() {
        let (_tmp, app) = new_app();
        let ran = format!("{}\n{}\n", RUN_MESSAGE, END_MESSAGE);
        let ran_then_failed = format!("{}\n{}\n", RUN_MESSAGE, FAILED_END_MESSAGE);

        let cases: Vec<(&str, Vec<Migration>, bool, String)> = vec![
            ("no migrations", vec![], false, String::new()),
            ("migration fail", vec![fails as Migration], true, String::new()),
            ("1 mig, apply", vec![applied as Migration], false, ran.clone()),
            ("2 mig, apply both", vec![applied as Migration, applied], false, ran.clone()),
            ("2 mig, apply 1", vec![noop as Migration, applied], false, ran.clone()),
            ("2 mig, first one fails", vec![fails as Migration, applied], true, String::new()),
            ("2 mig, apply 1, second one fails", vec![applied as Migration, fails], true, ran_then_failed),
        ];
        for (name, migs, should_err, expected) in cases {
            let mut runner = Runner::new(migs, Vec::new());
            let res = runner.run(&app);
            assert_eq!(res.is_err(), should_err, "{}", name);
            let out = String::from_utf8(runner.into_inner()).unwrap();
            assert_eq!(out, expected, "{}", name);
        }
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- app::migrations::tests::test_subnet_evm_rename --exact --show-output
    #[test]
    fn test_subnet_evm_rename() {
        let cases = [
            ("SubnetEVM", "Subnet-EVM"),
            ("Subnet-EVM", "Subnet-EVM"),
            ("unknown", "unknown"),
        ];
        for (vm, expected) in cases {
            let (_tmp, app) = new_app();
            let mut sc = Sidecar::new("test", VmType::from(vm.to_string()));
            app.create_sidecar(&mut sc).unwrap();

            let mut runner = Runner::new(vec![migrate_subnet_evm_names as Migration], Vec::new());
            runner.run(&app).unwrap();

            let loaded = app.load_sidecar("test").unwrap();
            assert_eq!(loaded.vm.to_string(), expected);
        }
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- app::migrations::tests::test_subnet_evm_rename_empty_dir --exact --show-output
    #[test]
    fn test_subnet_evm_rename_empty_dir() {
        let (_tmp, app) = new_app();
        fs::create_dir_all(app.get_blockchain_dir("emptySubnet")).unwrap();

        let mut runner = Runner::new(vec![migrate_subnet_evm_names as Migration], Vec::new());
        runner.run(&app).unwrap();
        assert!(runner.into_inner().is_empty());
    }

    /// RUST_LOG=debug cargo test --package avalanche-cli --lib -- app::migrations::tests::test_top_level_files --exact --show-output
    #[test]
    fn test_top_level_files() {
        let (_tmp, app) = new_app();
        let base = Path::new(&app.get_base_dir()).to_path_buf();

        for name in ["test1", "test2", "test3"] {
            let sc = Sidecar::new(name, VmType::SubnetEvm);
            let f = base.join(format!("{}{}", name, constants::LEGACY_SIDECAR_SUFFIX));
            fs::write(&f, serde_json::to_vec(&sc).unwrap()).unwrap();
        }
        let genesis = base.join(format!("test2{}", constants::LEGACY_GENESIS_SUFFIX));
        fs::write(&genesis, b"bogus").unwrap();

        let mut runner = Runner::new(vec![migrate_top_level_files as Migration], Vec::new());
        runner.run(&app).unwrap();

        for name in ["test1", "test2", "test3"] {
            assert!(Path::new(&app.get_blockchain_dir(name)).is_dir());
            assert!(!base
                .join(format!("{}{}", name, constants::LEGACY_SIDECAR_SUFFIX))
                .exists());
            assert_eq!(app.load_sidecar(name).unwrap().name, name);
        }
        assert!(!genesis.exists());
        assert_eq!(app.load_raw_genesis("test2").unwrap(), b"bogus");

        // second pass finds nothing left to move
        assert!(!migrate_top_level_files(&app).unwrap());
    }
}
