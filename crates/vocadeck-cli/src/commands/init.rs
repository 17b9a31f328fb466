//! The `vocadeck init` command.

use std::path::{Path, PathBuf};

use anyhow::Result;

use vocadeck_core::config::{VocadeckConfig, CONFIG_FILE_NAME};

pub fn execute(corpus: Option<PathBuf>) -> Result<()> {
    let mut config = VocadeckConfig::default();
    if let Some(corpus) = corpus {
        config.corpus_dir = corpus;
    }

    let config_path = Path::new(CONFIG_FILE_NAME);
    if config_path.exists() {
        println!("{CONFIG_FILE_NAME} already exists, skipping.");
    } else {
        let body = format!("# vocadeck configuration\n\n{}", config.to_toml()?);
        std::fs::write(config_path, body)?;
        println!("Created {CONFIG_FILE_NAME}");
    }

    std::fs::create_dir_all(&config.corpus_dir)?;
    let example_path = config.corpus_dir.join("example.md");
    if example_path.exists() {
        println!("{} already exists, skipping.", example_path.display());
    } else {
        std::fs::write(&example_path, EXAMPLE_CORPUS)?;
        println!("Created {}", example_path.display());
    }

    println!("\nNext steps:");
    println!("  1. Add entries to {}", config.corpus_dir.display());
    println!("  2. Run: vocadeck scan");
    println!("  3. Run: vocadeck new-day");
    println!("  4. Run: vocadeck study");

    Ok(())
}

const EXAMPLE_CORPUS: &str = "# Example vocabulary

One entry per line: `- source: target [pronunciation] [reading]`.
Both bracket groups are required. Headings set the category of the
entries below them.

## Animals
- 猫: cat [neko] [ねこ]
- 犬: dog [inu] [いぬ]
- 鳥: bird [tori] [とり]

## Food
- 水: water [mizu] [みず]
- 米: rice [kome] [こめ]
";
