/// Put the given file name into the system temporary directory and return
/// the full path. Tests that dump emission artifacts go through this so
/// repeated runs overwrite rather than accumulate.
pub fn temp_dir(fname: &str) -> String {
  let dir = std::env::temp_dir();
  let fname = dir.join(fname);
  fname.to_str().unwrap().to_string()
}
