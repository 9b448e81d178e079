use anyhow::Result;

use crate::hostinfo::HostInfo;

pub fn run() -> Result<()> {
    let info = HostInfo::collect();
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
