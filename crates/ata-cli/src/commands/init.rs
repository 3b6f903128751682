//! The `ata init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("ata.toml").exists() {
        println!("ata.toml already exists, skipping.");
    } else {
        std::fs::write("ata.toml", SAMPLE_CONFIG)?;
        println!("Created ata.toml");
    }

    std::fs::create_dir_all("pools")?;
    let example_path = std::path::Path::new("pools/example.csv");
    if example_path.exists() {
        println!("pools/example.csv already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_POOL)?;
        println!("Created pools/example.csv");
    }

    println!("\nNext steps:");
    println!("  1. Edit ata.toml with your ability levels and targets");
    println!("  2. Run: ata validate --items pools/example.csv");
    println!("  3. Run: ata assemble --items pools/example.csv");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# ata configuration

num_forms = 2
items_per_form = 4
scaling_constant = 1.702

# Ability levels and the test information each form should reach there.
thetas = [-1.0, 0.0, 1.0]
targets = [1.0, 1.4, 1.0]

# Minimum items per category (category labels 1..=K), per form.
content_minimums = [1, 1]
# content_maximums = [3, 3]

deviation_bound = 1.0
unbounded_deviation = false

[solver]
integrality_tolerance = 1e-6
mip_gap = 0.0
# time_limit_secs = 60

# Count limits on further item bank columns, per form. Several columns
# select on their combination, with keys like "hard,mc".
# [[attribute_constraints]]
# columns = ["band"]
# comparison = "<="
# values = { hard = 2 }
"#;

const EXAMPLE_POOL: &str = "\
item_id,a,b,c,category
Q01,1.10,-1.20,0.18,1
Q02,0.85,-0.60,0.22,1
Q03,1.35,-0.10,0.15,1
Q04,0.95,0.40,0.20,1
Q05,1.20,0.90,0.25,1
Q06,1.05,-1.40,0.20,2
Q07,1.25,-0.80,0.17,2
Q08,0.90,-0.20,0.23,2
Q09,1.40,0.30,0.19,2
Q10,1.00,0.80,0.21,2
";
