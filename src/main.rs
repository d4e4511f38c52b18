use clap::Parser;
use log::debug;
use opnode::{Node, NodePtr, OpRegistry, Result};

/// Inspect the arity and parsed attributes of a single graph node.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Op applied by the node, omit for a placeholder variable
    #[arg(long)]
    op: Option<String>,

    /// Node name used in diagnostics
    #[arg(long, default_value = "node")]
    name: String,

    /// Attribute as key=value, may be repeated
    #[arg(long = "attr", value_parser = parse_key_val)]
    attrs: Vec<(String, String)>,

    /// Positional scalar attribute, may be repeated
    #[arg(long = "scalar", allow_negative_numbers = true)]
    scalars: Vec<f64>,

    /// List the registered ops and exit
    #[arg(long)]
    list_ops: bool,
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, found {:?}", s))?;
    Ok((key.trim().to_owned(), value.trim().to_owned()))
}

fn build_node(args: &Args, registry: &OpRegistry) -> Result<NodePtr> {
    let node = match &args.op {
        Some(_) => Node::create(),
        None => Node::create_variable(args.name.as_str()),
    };

    {
        let mut node = node.borrow_mut();
        node.op = args
            .op
            .as_deref()
            .map(|name| registry.find(name))
            .transpose()?;
        node.attrs.name = args.name.clone();
        node.attrs.scalars = args.scalars.clone();
        for (key, value) in args.attrs.iter() {
            node.attrs.set(key.as_str(), value.as_str());
        }
        node.ensure_parsed()?;
    }

    Ok(node)
}

fn describe(node: &NodePtr) -> Result<()> {
    let node = node.borrow();

    println!("node:        {}", node.label());
    println!("variable:    {}", node.is_variable());
    println!("num_inputs:  {}", node.num_inputs()?);
    println!("num_outputs: {}", node.num_outputs()?);
    match &node.attrs.parsed {
        Some(parsed) => println!("parsed:      {:?}", parsed),
        None => println!("parsed:      <none>"),
    }

    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    debug!("{:?}", args);

    let registry = OpRegistry::global();

    if args.list_ops {
        for name in registry.list_names() {
            match registry.get(&name) {
                Some(op) if !op.description().is_empty() => {
                    println!("{:<14} {}", name, op.description())
                }
                _ => println!("{}", name),
            }
        }
        return;
    }

    if let Err(err) = build_node(&args, registry).and_then(|node| describe(&node)) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
