use std::path::Path;

use crate::cli::commands::{ConfigAction, ConfigCmd};
use crate::io::config_io;
use crate::io::lock::FileLock;

/// Seed written the first time `dp config set` creates config.toml
const CONFIG_TEMPLATE: &str = r##"# dayplan configuration
# Edit by hand or with: dp config set <section>.<key> <value>

[defaults]
# priority = "medium"     # low, medium or high
# edit_mode = true        # mode used until `dp mode` saves one

[reminders]
# enabled = true

[logging]
# level = "info"          # trace, debug, info, warn or error
"##;

pub fn cmd_config(
    args: ConfigCmd,
    data_dir: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match args.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = config_io::read_config(data_dir)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("# {}", config_io::config_path(data_dir).display());
                print!("{}", toml::to_string_pretty(&config)?);
            }
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            let _lock = FileLock::acquire_default(data_dir)?;
            let mut doc = if config_io::config_path(data_dir).exists() {
                config_io::read_config_document(data_dir)?
            } else {
                CONFIG_TEMPLATE.parse::<toml_edit::DocumentMut>()?
            };
            config_io::set_config_value(&mut doc, &key, &value)?;
            config_io::write_config(data_dir, &doc)?;
            println!("{} = {}", key, value);
            Ok(())
        }
    }
}
