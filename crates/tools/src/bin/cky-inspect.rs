//! Command-line tool for inspecting CoolKey token data
//!
//! Works offline on hex dumps: object blobs read from the applet, DER
//! certificates, signatures, command APDUs and card replies.

use std::error::Error;

use clap::{Parser, Subcommand, ValueEnum};
use coolkey_core::{Command, Response};
use coolkey_object::constants::cka;
use coolkey_object::der::{certificate_fields, common_name, ec_public_key, key_type, rsa_public_key};
use coolkey_object::{AttributeType, CardObject, DerSignature, KeyType};
use iso7816_tlv::ber::{Tlv, Value};
use tracing::debug;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an on-card object blob
    Object {
        /// Object id (hex, e.g. 6b300000)
        #[arg(short, long, value_parser = parse_object_id)]
        id: u32,

        /// How to interpret the blob
        #[arg(short, long, value_enum, default_value = "generic")]
        kind: BlobKind,

        /// Object blob (hex)
        blob: String,
    },

    /// Show the fields of a DER certificate
    Cert {
        /// Certificate (hex)
        der: String,
    },

    /// Convert between DER and raw `r || s` signatures
    Signature {
        /// Key size in bits
        #[arg(short, long, default_value_t = 256)]
        key_bits: usize,

        /// Input is raw `r || s` instead of DER
        #[arg(long)]
        from_raw: bool,

        /// Signature (hex)
        signature: String,
    },

    /// Encode a command APDU
    Apdu {
        /// Class byte (hex)
        #[arg(long, value_parser = parse_byte)]
        cla: u8,

        /// Instruction byte (hex)
        #[arg(long, value_parser = parse_byte)]
        ins: u8,

        /// First parameter (hex)
        #[arg(long, value_parser = parse_byte, default_value = "00")]
        p1: u8,

        /// Second parameter (hex)
        #[arg(long, value_parser = parse_byte, default_value = "00")]
        p2: u8,

        /// Command data (hex)
        #[arg(short, long)]
        data: Option<String>,

        /// Expected response length
        #[arg(long)]
        le: Option<usize>,
    },

    /// Split a card reply into payload and status
    Response {
        /// Reply including the trailing status word (hex)
        reply: String,
    },

    /// Dump BER-TLV structure
    Dump {
        /// Encoded data (hex)
        data: String,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum BlobKind {
    /// Attributes only
    Generic,
    /// Key with key defaults applied
    Key,
    /// Certificate carrying its DER value
    Cert,
}

fn parse_object_id(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0x");
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid object id {s}: {e}"))
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let digits = s.trim_start_matches("0x");
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid byte {s}: {e}"))
}

fn decode_hex(s: &str) -> Result<Vec<u8>, Box<dyn Error>> {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace() && *c != ':').collect();
    Ok(hex::decode(cleaned)?)
}

fn attribute_name(attr_type: AttributeType) -> &'static str {
    match attr_type {
        cka::CLASS => "CLASS",
        cka::TOKEN => "TOKEN",
        cka::PRIVATE => "PRIVATE",
        cka::LABEL => "LABEL",
        cka::VALUE => "VALUE",
        cka::CERTIFICATE_TYPE => "CERTIFICATE_TYPE",
        cka::ISSUER => "ISSUER",
        cka::SERIAL_NUMBER => "SERIAL_NUMBER",
        cka::KEY_TYPE => "KEY_TYPE",
        cka::SUBJECT => "SUBJECT",
        cka::ID => "ID",
        cka::SENSITIVE => "SENSITIVE",
        cka::ENCRYPT => "ENCRYPT",
        cka::DECRYPT => "DECRYPT",
        cka::WRAP => "WRAP",
        cka::UNWRAP => "UNWRAP",
        cka::SIGN => "SIGN",
        cka::SIGN_RECOVER => "SIGN_RECOVER",
        cka::VERIFY => "VERIFY",
        cka::VERIFY_RECOVER => "VERIFY_RECOVER",
        cka::DERIVE => "DERIVE",
        cka::START_DATE => "START_DATE",
        cka::END_DATE => "END_DATE",
        cka::MODULUS => "MODULUS",
        cka::PUBLIC_EXPONENT => "PUBLIC_EXPONENT",
        cka::EXTRACTABLE => "EXTRACTABLE",
        cka::LOCAL => "LOCAL",
        cka::NEVER_EXTRACTABLE => "NEVER_EXTRACTABLE",
        cka::ALWAYS_SENSITIVE => "ALWAYS_SENSITIVE",
        cka::MODIFIABLE => "MODIFIABLE",
        cka::EC_PARAMS => "EC_PARAMS",
        cka::EC_POINT => "EC_POINT",
        _ => "?",
    }
}

fn print_object(object: &CardObject) {
    println!(
        "Object {:#010x} (handle {:#x}, {:?})",
        object.object_id(),
        object.handle(),
        object.kind()
    );
    if object.key_type() != KeyType::Unknown {
        println!("  key type: {:?}", object.key_type());
    }
    if let Some(name) = object.name() {
        println!("  name: {name}");
    }
    for attribute in object.attributes().iter() {
        println!(
            "  {:#010x} {:<18} {}",
            attribute.attr_type(),
            attribute_name(attribute.attr_type()),
            hex::encode_upper(attribute.value())
        );
    }
}

fn print_certificate(der: &[u8]) -> Result<(), Box<dyn Error>> {
    let fields = certificate_fields(der)?;
    println!("Serial:  {}", hex::encode_upper(fields.serial_value));
    for (label, name) in [("Subject", fields.subject), ("Issuer", fields.issuer)] {
        match common_name(name) {
            Ok(cn) => println!("{label}: CN={}", String::from_utf8_lossy(cn)),
            Err(e) => println!("{label}: {} ({e})", hex::encode_upper(name)),
        }
    }

    let spki = fields.public_key;
    match key_type(spki)? {
        KeyType::Rsa => {
            let key = rsa_public_key(spki)?;
            println!("Key:     RSA");
            println!("  modulus:  {}", hex::encode_upper(key.modulus));
            println!("  exponent: {}", hex::encode_upper(key.exponent));
        }
        _ => {
            let key = ec_public_key(spki)?;
            println!("Key:     EC");
            println!("  point:  {}", hex::encode_upper(key.point));
            println!("  params: {}", hex::encode_upper(key.params));
        }
    }
    Ok(())
}

fn print_tlv(tlv: &Tlv, depth: usize) {
    let indent = "  ".repeat(depth);
    let tag = hex::encode_upper(tlv.tag().to_bytes());
    match tlv.value() {
        Value::Primitive(bytes) => {
            println!("{indent}{tag} [{}] {}", bytes.len(), hex::encode_upper(bytes));
        }
        Value::Constructed(children) => {
            println!("{indent}{tag}");
            for child in children {
                print_tlv(child, depth + 1);
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize the tracing logger with env_format and ansi
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Object { id, kind, blob } => {
            let blob = decode_hex(&blob)?;
            debug!(len = blob.len(), "Decoding blob");
            let object = match kind {
                BlobKind::Generic => CardObject::decode(id, &blob, 0)?,
                BlobKind::Key => CardObject::key(id, &blob, 0)?,
                BlobKind::Cert => CardObject::certificate(id, &blob, 0, None)?,
            };
            print_object(&object);
        }
        Commands::Cert { der } => {
            print_certificate(&decode_hex(&der)?)?;
        }
        Commands::Signature {
            key_bits,
            from_raw,
            signature,
        } => {
            let input = decode_hex(&signature)?;
            if from_raw {
                let der = DerSignature::from_raw(&input)?;
                println!("{}", hex::encode_upper(der.as_bytes()));
            } else {
                let raw = DerSignature::new(input).to_raw(key_bits)?;
                println!("{raw}");
            }
        }
        Commands::Apdu {
            cla,
            ins,
            p1,
            p2,
            data,
            le,
        } => {
            let mut command = Command::new(cla, ins, p1, p2);
            if let Some(data) = data {
                command.set_data(decode_hex(&data)?)?;
            }
            if let Some(le) = le {
                command.set_receive_length(le)?;
            }
            println!("{}", hex::encode_upper(command.to_bytes()));
        }
        Commands::Response { reply } => {
            let response = Response::from_bytes(&decode_hex(&reply)?)?;
            let status = response.status();
            println!("Payload: {}", hex::encode_upper(response.payload()));
            println!("Status:  {status} ({})", status.description());
        }
        Commands::Dump { data } => {
            let data = decode_hex(&data)?;
            let tlvs = Tlv::parse_all(&data);
            if tlvs.is_empty() {
                println!("No TLV data found.");
            }
            for tlv in &tlvs {
                print_tlv(tlv, 0);
            }
        }
    }

    Ok(())
}
