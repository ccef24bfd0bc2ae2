use crate::cli::{ProtocolKind, SchemaArgs};
use crate::error::Result;
use reliontomo::core::forms::{de_novo_form, reconstruct_form};
use reliontomo::core::params::FormSchema;

pub fn run(args: SchemaArgs) -> Result<()> {
    print!("{}", schema_for(args.protocol));
    Ok(())
}

fn schema_for(protocol: ProtocolKind) -> FormSchema {
    match protocol {
        ProtocolKind::Denovo => de_novo_form(),
        ProtocolKind::Reconstruct => reconstruct_form(),
    }
}
