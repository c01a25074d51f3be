use std::fs;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use lab_stack_core::compute::{AssetLocation, HandlerVariant};
use lab_stack_core::identity::RoleLayout;
use lab_stack_core::stack::{LabStack, StackConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "synth",
    about = "Synthesize the lambda IAM lab stack into a CloudFormation template"
)]
struct Cli {
    /// JSON stack configuration; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, env = "LAB_STACK_NAME")]
    stack_name: Option<String>,
    /// Directory receiving `<stack-name>.template.json`
    #[arg(long, env = "LAB_OUT_DIR", default_value = "cdk.out")]
    out_dir: PathBuf,
    #[arg(value_enum, long)]
    role_layout: Option<LayoutArg>,
    #[arg(value_enum, long)]
    handler_variant: Option<VariantArg>,
    /// Name the bucket instead of letting CloudFormation generate one
    #[arg(long)]
    bucket_name: Option<String>,
    /// Bucket holding the packaged Rust handler; switches the function to `provided.al2023`
    #[arg(long, requires = "code_key")]
    code_bucket: Option<String>,
    #[arg(long, requires = "code_bucket")]
    code_key: Option<String>,
    /// Print the template instead of writing it
    #[arg(long)]
    stdout: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    Split,
    Unified,
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    CountOnly,
    WithKeys,
}

fn load_config(cli: &Cli) -> Result<StackConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|error| format!("failed to read {}: {error}", path.display()))?;
            StackConfig::from_json_str(&text)?
        }
        None => StackConfig::default(),
    };

    if let Some(stack_name) = &cli.stack_name {
        config.stack_name = stack_name.clone();
    }
    if let Some(layout) = cli.role_layout {
        config.role_layout = match layout {
            LayoutArg::Split => RoleLayout::Split,
            LayoutArg::Unified => RoleLayout::Unified,
        };
    }
    if let Some(variant) = cli.handler_variant {
        config.function.handler_variant = match variant {
            VariantArg::CountOnly => HandlerVariant::CountOnly,
            VariantArg::WithKeys => HandlerVariant::WithKeys,
        };
    }
    if let Some(bucket_name) = &cli.bucket_name {
        config.bucket.physical_name = Some(bucket_name.clone());
    }
    if let (Some(bucket), Some(key)) = (&cli.code_bucket, &cli.code_key) {
        config.function.asset = Some(AssetLocation {
            bucket: bucket.clone(),
            key: key.clone(),
        });
    }

    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let definition = LabStack::compose(&config)?;
    let template = definition.to_template_string()?;

    if cli.stdout {
        println!("{template}");
        return Ok(());
    }

    fs::create_dir_all(&cli.out_dir)?;
    let path = cli
        .out_dir
        .join(format!("{}.template.json", definition.stack_name));
    fs::write(&path, template)?;
    tracing::info!(
        component = "synth",
        event = "template_written",
        path = %path.display(),
        outputs = ?definition.output_names(),
    );

    Ok(())
}
