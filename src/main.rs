/*
 * keysplit: split-key encryption with threshold share recovery
 * Copyright (C) 2023-2024 Aleksa Sarai <cyphar@cyphar.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::{
    error::Error as StdError,
    fs,
    io,
    io::prelude::*,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Error};
use clap::{Arg, ArgAction, ArgMatches, Command};

extern crate keysplit_core;
use keysplit_core::{envelope, shamir, EnvelopeDocument, PayloadMeta, ShareDocument, ShareSet};

// keysplit-cli protect -n <NUM SHARES> -t <THRESHOLD> [--output-dir DIR] [--mime MIME] INPUT
fn protect_cli() -> Command {
    Command::new("protect")
        .about("Encrypt a secret and split its key into a quorum of share files.")
        .arg(
            Arg::new("shares")
                .short('n')
                .long("shares")
                .value_name("NUM SHARES")
                .help("Number of share files to create (must not be smaller than --threshold).")
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new("threshold")
                .short('t')
                .long("threshold")
                .value_name("THRESHOLD")
                .help("Number of shares required to recover the secret (must not be larger than --shares).")
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory to write envelope.json and the share files into.")
                .action(ArgAction::Set)
                .default_value("."),
        )
        .arg(
            Arg::new("mime")
                .long("mime")
                .value_name("MIME")
                .help("MIME type recorded for a file payload (ignored for stdin input).")
                .action(ArgAction::Set)
                .default_value("application/octet-stream"),
        )
        .arg(
            Arg::new("INPUT")
                .help(r#"Path to the file to protect ("-" to read text from stdin)."#)
                .action(ArgAction::Set)
                .allow_hyphen_values(true)
                .required(true)
                .index(1),
        )
}

fn protect(matches: &ArgMatches) -> Result<(), Error> {
    let shares_count: u16 = matches
        .get_one::<String>("shares")
        .context("required --shares argument not provided")?
        .parse()
        .context("--shares argument was not an unsigned integer")?;
    let threshold: u16 = matches
        .get_one::<String>("threshold")
        .context("required --threshold argument not provided")?
        .parse()
        .context("--threshold argument was not an unsigned integer")?;
    let output_dir = PathBuf::from(
        matches
            .get_one::<String>("output-dir")
            .context("required --output-dir argument not provided")?,
    );
    let mime = matches
        .get_one::<String>("mime")
        .context("--mime argument not provided")?;
    let input_path = matches
        .get_one::<String>("INPUT")
        .context("required INPUT argument not provided")?;

    let (plaintext, meta) = if input_path == "-" {
        let mut text = Vec::new();
        io::stdin()
            .read_to_end(&mut text)
            .context("failed to read secret data from stdin")?;
        (text, PayloadMeta::Text)
    } else {
        let data = fs::read(input_path)
            .with_context(|| format!("failed to read secret data file '{}'", input_path))?;
        let filename = Path::new(input_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "secret.bin".to_string());
        (
            data,
            PayloadMeta::File {
                filename,
                mime: mime.clone(),
            },
        )
    };

    let (sealed, key) = envelope::seal(&plaintext, meta).context("sealing payload")?;
    let shares = shamir::split(&key, shares_count, threshold).context("splitting key")?;
    drop(key);

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create output directory '{}'", output_dir.display()))?;

    let envelope_path = output_dir.join("envelope.json");
    fs::write(&envelope_path, EnvelopeDocument::encode(&sealed).to_json())
        .with_context(|| format!("failed to write '{}'", envelope_path.display()))?;
    println!("Wrote {}", envelope_path.display());

    for share in &shares {
        let document = ShareDocument::encode(share, threshold, shares_count);
        let share_path = output_dir.join(format!("share-{}.json", document.index));
        fs::write(&share_path, document.to_json())
            .with_context(|| format!("failed to write '{}'", share_path.display()))?;
        println!("Wrote {} (hash: {})", share_path.display(), document.hash);
    }

    println!(
        "Distribute the {} share files; any {} of them recover the secret.",
        shares_count, threshold
    );

    Ok(())
}

// keysplit-cli recover --envelope <ENVELOPE> [--output OUTPUT] SHARE...
fn recover_cli() -> Command {
    Command::new("recover")
        .about("Reconstruct the key from share files and decrypt the envelope.")
        .arg(
            Arg::new("envelope")
                .short('e')
                .long("envelope")
                .value_name("ENVELOPE")
                .help("Path to the envelope JSON file.")
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT")
                .help(
                    r#"Path to write the recovered payload to ("-" for stdout). Defaults to stdout for a text payload and to the recorded filename for a file payload."#,
                )
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("SHARES")
                .value_name("SHARE")
                .help("Paths to share JSON files (at least 2).")
                .action(ArgAction::Append)
                .required(true),
        )
}

fn recover(matches: &ArgMatches) -> Result<(), Error> {
    let envelope_path = matches
        .get_one::<String>("envelope")
        .context("required --envelope argument not provided")?;
    let output_path = matches.get_one::<String>("output");
    let share_paths = matches
        .get_many::<String>("SHARES")
        .context("required share file arguments not given")?
        .collect::<Vec<_>>();

    let envelope_json = fs::read_to_string(envelope_path)
        .with_context(|| format!("failed to read envelope file '{}'", envelope_path))?;
    let sealed = EnvelopeDocument::from_json(&envelope_json)
        .and_then(|document| document.decode())
        .map_err(|err| anyhow!("failed to parse envelope '{}': {}", envelope_path, err))?;

    let mut set = ShareSet::new();
    for path in &share_paths {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) => {
                eprintln!("skipping share file '{}': {}", path, err);
                continue;
            }
        };
        match set.push_json(&data) {
            Ok(index) => println!("Loaded share {} from '{}'.", index, path),
            Err(err) => eprintln!("skipping share file '{}': {}", path, err),
        }
    }
    if set.skipped() > 0 {
        eprintln!("{} invalid share(s) ignored", set.skipped());
    }

    let key = set
        .recover_key(sealed.key_len())
        .context("reconstructing key from shares")?;
    let plaintext = envelope::open(&sealed, &key).context(
        "decrypting payload (the shares were too few or inconsistent, or the envelope was tampered with)",
    )?;
    drop(key);

    // A file payload defaults to the filename recorded at protect time; a
    // text payload defaults to stdout. Only the base name of the recorded
    // filename is used, wherever it claims to live.
    let output_path = match output_path {
        Some(path) => path.clone(),
        None => match sealed.meta() {
            PayloadMeta::Text => "-".to_string(),
            PayloadMeta::File { filename, .. } => Path::new(filename)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "recovered.bin".to_string()),
        },
    };

    if output_path == "-" {
        io::stdout()
            .write_all(&plaintext)
            .context("write recovered payload to stdout")?;
    } else {
        fs::write(&output_path, &plaintext)
            .with_context(|| format!("failed to write recovered payload to '{}'", output_path))?;
        println!("Recovered payload written to '{}'.", output_path);
    }

    Ok(())
}

fn cli() -> Command {
    Command::new("keysplit-cli")
        .version("0.0.0")
        .author("Aleksa Sarai <cyphar@cyphar.com>")
        .about("Protect a secret by splitting its encryption key into a threshold quorum of shares.")
        // keysplit-cli protect -n <NUM SHARES> -t <THRESHOLD> INPUT
        .subcommand(protect_cli())
        // keysplit-cli recover --envelope <ENVELOPE> SHARE...
        .subcommand(recover_cli())
}

fn main() -> Result<(), Box<dyn StdError>> {
    let mut app = cli();

    let ret = match app.get_matches_mut().subcommand() {
        Some(("protect", sub_matches)) => protect(sub_matches),
        Some(("recover", sub_matches)) => recover(sub_matches),
        Some((subcommand, _)) => {
            // We should never end up here.
            app.print_help()?;
            Err(anyhow!("unknown subcommand '{}'", subcommand))
        }
        None => {
            app.print_help()?;
            Err(anyhow!("no subcommand specified"))
        }
    }?;

    Ok(ret)
}

#[test]
fn verify_cli() {
    cli().debug_assert();
}
