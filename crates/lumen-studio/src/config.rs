use std::path::PathBuf;

use clap::Parser;

/// Studio configuration, from the command line.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(version, about = "Projection mapping studio", long_about = None)]
pub struct StudioConfig {
    /// Image projected onto the demo surface. Without one, a generated
    /// pattern is streamed from a producer thread.
    #[arg(value_name = "IMAGE")]
    pub image: Option<PathBuf>,

    /// Where Ctrl+S writes the scene description.
    #[arg(short = 's', long = "save", value_name = "PATH", default_value = "lumen-scene.json")]
    pub save_path: PathBuf,

    /// Borderless fullscreen output.
    #[arg(short = 'F', long = "fullscreen")]
    pub fullscreen: bool,

    /// Monitor index used with --fullscreen.
    #[arg(short = 'm', long = "monitor", value_name = "N")]
    pub monitor: Option<usize>,

    /// Filter for the logger, e.g. "debug" or "lumen_engine=debug,wgpu=warn".
    #[arg(long = "log", value_name = "FILTER")]
    pub log_filter: Option<String>,

    #[arg(long = "title", default_value = "lumen studio")]
    pub title: String,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self::parse_from(["lumen-studio"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> StudioConfig {
        StudioConfig::try_parse_from(std::iter::once("lumen-studio").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn first_positional_is_the_image() {
        let c = parse(&["shot.png"]);
        assert_eq!(c.image, Some(PathBuf::from("shot.png")));
        assert_eq!(c.save_path, PathBuf::from("lumen-scene.json"));
        assert!(!c.fullscreen);
    }

    #[test]
    fn flags_override_defaults() {
        let c = parse(&["--save", "out.json", "-F", "--monitor", "1", "--log", "debug"]);
        assert_eq!(c.image, None);
        assert_eq!(c.save_path, PathBuf::from("out.json"));
        assert!(c.fullscreen);
        assert_eq!(c.monitor, Some(1));
        assert_eq!(c.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn bad_monitor_is_rejected() {
        let args = ["lumen-studio", "--monitor", "left"];
        assert!(StudioConfig::try_parse_from(args).is_err());
    }

    #[test]
    fn command_is_well_formed() {
        use clap::CommandFactory;
        StudioConfig::command().debug_assert();
    }
}
