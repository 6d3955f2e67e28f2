use anyhow::Result;
use radgeom::settings;
use radgeom::survey::Survey;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = settings::load_config()?;
    println!("{}", settings);

    let mut survey = Survey::from_settings(settings)?;

    survey.run();
    survey.result.print();
    survey.writeup()
}
