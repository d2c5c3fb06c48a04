use cubes_demo::{config::Config, scene::run_demo};

fn main() -> anyhow::Result<()> {
    let config = Config::load_or_default(&Config::default_path())?;
    run_demo(config)
}
