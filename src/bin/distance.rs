use std::io::Write;
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;

use wordtovec::VectorizedDictionary;

/// number of closest words that will be shown
const N: usize = 40;

#[derive(Parser)]
struct Options {
    /// Contains word projections in the BINARY FORMAT.
    #[arg(value_name = "FILE")]
    file_name: PathBuf,
}

fn run(options: &Options) -> Result<()> {
    let vectors = VectorizedDictionary::load_file(&options.file_name)?;

    let mut line = String::new();
    'outer: loop {
        print!("Enter word or sentence (EXIT to break): ");
        let _ = std::io::stdout().flush();

        line.clear();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim() == "EXIT" {
            break;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        for &word in &words {
            println!();
            print!("Word: {word}  Position in vocabulary: ");
            match vectors.position(word) {
                None => {
                    println!("None");
                    println!("Out of dictionary word!");
                    continue 'outer;
                }
                Some(i) => println!("{i}"),
            }
        }

        println!();
        println!("                                              Word       Cosine distance");
        println!("------------------------------------------------------------------------");
        for (word, dist) in vectors.most_similar(&words, N)? {
            println!("{:>50}\t\t{:8.6}", word, dist);
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let options = Options::parse();
    if let Err(err) = run(&options) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
