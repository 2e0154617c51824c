use std::path::PathBuf;

pub fn mrcluster_bin() -> anyhow::Result<PathBuf> {
    if let Some(path) = std::env::var_os("CARGO_BIN_EXE_mrcluster") {
        return Ok(path.into());
    }

    let exe = std::env::current_exe()?;
    let deps_dir = exe
        .parent()
        .ok_or_else(|| anyhow::anyhow!("test binary has no parent"))?;
    let target_dir = deps_dir
        .parent()
        .ok_or_else(|| anyhow::anyhow!("deps dir has no parent"))?;
    let candidate = target_dir.join(if cfg!(windows) {
        "mrcluster.exe"
    } else {
        "mrcluster"
    });
    if candidate.exists() {
        return Ok(candidate);
    }

    anyhow::bail!(
        "mrcluster binary not found (checked CARGO_BIN_EXE_mrcluster and {})",
        candidate.display()
    )
}
