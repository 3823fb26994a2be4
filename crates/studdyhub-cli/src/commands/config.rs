use clap::Subcommand;
use studdyhub_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value by dot path
    Get {
        /// e.g. "cycle.focus_secs", "session.focus_level", "backend.kind"
        key: String,
    },
    /// Change one value by dot path (validated before saving)
    Set {
        key: String,
        value: String,
    },
    /// Show settings as `key = value` lines
    List {
        /// Only show one section: cycle, session, notifications or backend
        section: Option<String>,
        /// Print the whole file as JSON instead (API key included)
        #[arg(long)]
        json: bool,
    },
    /// Restore defaults for one section, or everything when omitted
    Reset {
        section: Option<String>,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            println!("{key} = {}", config.get(&key).unwrap_or(value));
        }
        ConfigAction::List { section, json } => {
            let config = Config::load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
                return Ok(());
            }
            let prefix = section.map(|s| format!("{s}."));
            let mut shown = 0;
            for (key, value) in config.entries() {
                if prefix.as_deref().is_some_and(|p| !key.starts_with(p)) {
                    continue;
                }
                println!("{key} = {value}");
                shown += 1;
            }
            if shown == 0 {
                return Err("no settings in that section".into());
            }
        }
        ConfigAction::Reset { section } => match section {
            Some(section) => {
                let mut config = Config::load()?;
                config.reset_section(&section)?;
                config.save()?;
                println!("{section} settings reset to defaults");
            }
            None => {
                Config::default().save()?;
                println!("all settings reset to defaults");
            }
        },
    }
    Ok(())
}
