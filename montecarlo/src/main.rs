use env_logger::Env;
use montecarlo::cli::{Args, BaseCommand, Command};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = Args::new(pico_args::Arguments::from_env());

    match BaseCommand::try_from_cli_args(args).and_then(BaseCommand::run) {
        Ok(output) => println!("{}", output),
        Err(err) => {
            eprintln!("error: {}", err);
            eprintln!("Try 'montecarlo --help' for more information.");
            std::process::exit(1);
        }
    }
}
