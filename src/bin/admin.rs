use std::collections::VecDeque;

use uuid::Uuid;

use safeplate_ledger::crypto::{
    decode_words, encode_words, public_key_to_hex, secret_key_from_hex, OracleSigningKey,
    OracleVerifyingKey,
};
use safeplate_ledger::infra::seal_value;
use safeplate_ledger::{DecryptionCallback, RequestId};

fn print_help() {
    eprintln!(
        "\
safeplate-admin

USAGE:
  safeplate-admin <command> [options]

COMMANDS:
  keygen                          Generate an oracle (or store) key pair
  seal                            Seal a score as an encrypted input
  encode-payload                  Encode u32 values as a cleartext payload
  decode-payload                  Decode a cleartext payload
  sign-callback                   Build a signed oracle callback (JSON)
  verify-callback                 Verify an oracle callback proof

seal OPTIONS:
  --store-key <hex>               (defaults to env CIPHERTEXT_STORE_KEY)
  --value <n>                     (required)

encode-payload OPTIONS:
  --values <n,n,...>              (required)

decode-payload OPTIONS:
  --payload <hex>                 (required)
  --arity <n>                     (required) Expected number of words

sign-callback OPTIONS:
  --signing-key <hex>             (defaults to env ORACLE_SIGNING_KEY)
  --request-id <uuid>             (required)
  --values <n,n,...>              (required)

verify-callback OPTIONS:
  --public-key <hex>              (defaults to env ORACLE_PUBLIC_KEY)
  --callback <json>               (required) Callback as produced by sign-callback
"
    );
}

fn next_value(args: &mut VecDeque<String>, flag: &str) -> anyhow::Result<String> {
    args.pop_front()
        .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
}

fn from_env_or(value: Option<String>, var: &str, flag: &str) -> anyhow::Result<String> {
    value
        .or_else(|| std::env::var(var).ok())
        .ok_or_else(|| anyhow::anyhow!("{flag} is required (or set {var})"))
}

fn parse_values(raw: &str) -> anyhow::Result<Vec<u32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|e| anyhow::anyhow!("invalid value {s:?}: {e}"))
        })
        .collect()
}

fn parse_hex(raw: &str) -> anyhow::Result<Vec<u8>> {
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    Ok(hex::decode(raw)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args: VecDeque<String> = std::env::args().skip(1).collect();
    let Some(command) = args.pop_front() else {
        print_help();
        return Ok(());
    };

    if matches!(command.as_str(), "-h" | "--help" | "help") {
        print_help();
        return Ok(());
    }

    match command.as_str() {
        "keygen" => {
            if let Some(other) = args.pop_front() {
                anyhow::bail!("unexpected argument: {other}");
            }
            let key = OracleSigningKey::generate();
            println!("secret_key: 0x{}", hex::encode(key.to_bytes()));
            println!("public_key: {}", public_key_to_hex(&key.public_key_bytes()));
            Ok(())
        }
        "seal" => {
            let mut store_key: Option<String> = None;
            let mut value: Option<u32> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--store-key" => store_key = Some(next_value(&mut args, "--store-key")?),
                    "--value" => value = Some(next_value(&mut args, "--value")?.parse()?),
                    "-h" | "--help" => {
                        print_help();
                        return Ok(());
                    }
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let store_key = from_env_or(store_key, "CIPHERTEXT_STORE_KEY", "--store-key")?;
            let key = secret_key_from_hex(&store_key)?;
            let value = value.ok_or_else(|| anyhow::anyhow!("--value is required"))?;
            println!("{}", serde_json::to_string(&seal_value(&key, value))?);
            Ok(())
        }
        "encode-payload" => {
            let mut values: Option<Vec<u32>> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--values" => values = Some(parse_values(&next_value(&mut args, "--values")?)?),
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let values = values.ok_or_else(|| anyhow::anyhow!("--values is required"))?;
            println!("0x{}", hex::encode(encode_words(&values)));
            Ok(())
        }
        "decode-payload" => {
            let mut payload: Option<Vec<u8>> = None;
            let mut arity: Option<usize> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--payload" => payload = Some(parse_hex(&next_value(&mut args, "--payload")?)?),
                    "--arity" => arity = Some(next_value(&mut args, "--arity")?.parse()?),
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let payload = payload.ok_or_else(|| anyhow::anyhow!("--payload is required"))?;
            let arity = arity.ok_or_else(|| anyhow::anyhow!("--arity is required"))?;
            let words = decode_words(&payload, arity)?;
            println!("{}", serde_json::to_string(&words)?);
            Ok(())
        }
        "sign-callback" => {
            let mut signing_key: Option<String> = None;
            let mut request_id: Option<Uuid> = None;
            let mut values: Option<Vec<u32>> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--signing-key" => {
                        signing_key = Some(next_value(&mut args, "--signing-key")?)
                    }
                    "--request-id" => {
                        request_id = Some(Uuid::parse_str(&next_value(&mut args, "--request-id")?)?)
                    }
                    "--values" => values = Some(parse_values(&next_value(&mut args, "--values")?)?),
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let signing_key = from_env_or(signing_key, "ORACLE_SIGNING_KEY", "--signing-key")?;
            let key = OracleSigningKey::from_bytes(&secret_key_from_hex(&signing_key)?);
            let request_id = RequestId::from_uuid(
                request_id.ok_or_else(|| anyhow::anyhow!("--request-id is required"))?,
            );
            let values = values.ok_or_else(|| anyhow::anyhow!("--values is required"))?;

            let cleartexts = encode_words(&values);
            let proof = key.sign_decryption(&request_id, &cleartexts);
            let callback = DecryptionCallback {
                request_id,
                cleartexts,
                proof,
            };
            println!("{}", serde_json::to_string_pretty(&callback)?);
            Ok(())
        }
        "verify-callback" => {
            let mut public_key: Option<String> = None;
            let mut callback: Option<String> = None;
            while let Some(arg) = args.pop_front() {
                match arg.as_str() {
                    "--public-key" => public_key = Some(next_value(&mut args, "--public-key")?),
                    "--callback" => callback = Some(next_value(&mut args, "--callback")?),
                    other => anyhow::bail!("unexpected argument: {other}"),
                }
            }

            let public_key = from_env_or(public_key, "ORACLE_PUBLIC_KEY", "--public-key")?;
            let key = OracleVerifyingKey::from_hex(&public_key)?;
            let callback = callback.ok_or_else(|| anyhow::anyhow!("--callback is required"))?;
            let callback: DecryptionCallback = serde_json::from_str(&callback)?;

            key.verify_decryption(&callback.request_id, &callback.cleartexts, &callback.proof)?;
            println!("ok: proof valid for request {}", callback.request_id);
            Ok(())
        }
        other => {
            print_help();
            anyhow::bail!("unknown command: {other}")
        }
    }
}
