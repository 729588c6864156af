use crate::error::Result;
use crate::models::ALL_ISSUERS;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    save_settings(&settings)?;

    for &issuer in ALL_ISSUERS {
        std::fs::create_dir_all(settings.input_dir(issuer))?;
    }
    std::fs::create_dir_all(settings.output_dir())?;

    println!("Initialized statements directory at {}", settings.data_dir().display());
    for &issuer in ALL_ISSUERS {
        println!("  {:<6} {}", issuer.label(), settings.input_dir(issuer).display());
    }
    println!("  output {}", settings.output_dir().display());
    Ok(())
}
