use clap::Parser;
use dotenv::dotenv;
use signaturize::ai::client::GeminiClient;
use signaturize::config::ModelConfig;
use signaturize::{from_dspy_string, PromptInterpreter, Signature};
use std::path::PathBuf;

const DEMO_PROMPT: &str = r#"
    Given a customer support ticket, decide which team should handle it
    (billing, technical or account), how urgent it is on a 1-5 scale,
    and draft a short first reply to the customer.
"#;

#[derive(Parser, Debug)]
#[command(version, about = "Turn a task description into a typed signature")]
struct Cli {
    /// Parse a signature file instead of generating one.
    #[arg(long, value_name = "FILE")]
    parse: Option<PathBuf>,

    /// Task description. The built-in demo prompt is used when omitted.
    #[arg(conflicts_with = "parse")]
    prompt: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::builder().filter_level(log::LevelFilter::Info).init();

    let cli = Cli::parse();

    if let Some(path) = &cli.parse {
        let source = std::fs::read_to_string(path)?;
        let signature = from_dspy_string(&source)?;
        println!("{}", serde_json::to_string_pretty(&signature)?);
        print_input_template(&signature)?;
        return Ok(());
    }

    let prompt = if cli.prompt.is_empty() {
        DEMO_PROMPT.to_string()
    } else {
        cli.prompt.join(" ")
    };

    let config = ModelConfig::from_env()?;
    let timeout = config.call_budget();
    let interpreter = PromptInterpreter::new(GeminiClient::new(config)?).with_timeout(timeout);

    println!("📝 Processing Request: \"{}\"\n", prompt.trim());

    let code = interpreter.from_prompt(&prompt, "string").await?.to_string();

    println!("📦 SIGNATURE READY");
    println!("--------------------------------------------------");
    println!("{code}");

    let signature = from_dspy_string(&code)?;
    print_input_template(&signature)?;

    Ok(())
}

fn print_input_template(signature: &Signature) -> Result<(), serde_json::Error> {
    println!("Inputs for '{}':", signature.name());
    println!("{}", serde_json::to_string_pretty(&signature.input_template())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn prompt_words_are_collected() {
        let cli = Cli::try_parse_from(["signaturize", "summarize", "a", "paper"]).unwrap();
        assert_eq!(cli.prompt, vec!["summarize", "a", "paper"]);
        assert!(cli.parse.is_none());
    }

    #[test]
    fn parse_flag_takes_a_file() {
        let cli = Cli::try_parse_from(["signaturize", "--parse", "qa.py"]).unwrap();
        assert_eq!(cli.parse, Some(PathBuf::from("qa.py")));
        assert!(cli.prompt.is_empty());

        assert!(Cli::try_parse_from(["signaturize", "--parse"]).is_err());
        assert!(Cli::try_parse_from(["signaturize", "--parse", "qa.py", "extra"]).is_err());
    }
}
