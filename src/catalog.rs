//! The challenge catalog: built-in bank plus optional TOML bank entries,
//! immutable after construction.

use std::collections::HashMap;

use tracing::error;

use crate::domain::{Challenge, ChallengeKind, ChallengeSource, Difficulty};

/// Read-only, id-indexed view over all challenges. Built once at startup;
/// no runtime mutation or deletion.
pub struct Catalog {
  by_id: HashMap<u32, Challenge>,
  ordered: Vec<u32>,
}

impl Catalog {
  /// Build from a bank of challenges. Ids must be unique; a duplicate is
  /// logged and skipped, first entry wins.
  pub fn build(bank: Vec<Challenge>) -> Self {
    let mut by_id = HashMap::<u32, Challenge>::new();
    for ch in bank {
      if by_id.contains_key(&ch.id) {
        error!(target: "challenge", id = ch.id, "Skipping bank item: duplicate id");
        continue;
      }
      by_id.insert(ch.id, ch);
    }
    let mut ordered: Vec<u32> = by_id.keys().copied().collect();
    ordered.sort_unstable();
    Self { by_id, ordered }
  }

  pub fn get(&self, id: u32) -> Option<&Challenge> {
    self.by_id.get(&id)
  }

  /// Challenges in ascending id order.
  pub fn iter(&self) -> impl Iterator<Item = &Challenge> {
    self.ordered.iter().filter_map(|id| self.by_id.get(id))
  }

  pub fn by_difficulty(&self, difficulty: Difficulty) -> Vec<&Challenge> {
    self.iter().filter(|c| c.difficulty == difficulty).collect()
  }

  pub fn len(&self) -> usize {
    self.by_id.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_id.is_empty()
  }
}

fn theory(
  id: u32,
  difficulty: Difficulty,
  title: &str,
  description: &str,
  problem: &str,
  answer: &str,
  flag_token: &str,
  hint: &str,
) -> Challenge {
  Challenge {
    id,
    difficulty,
    kind: ChallengeKind::Theory,
    source: ChallengeSource::BuiltIn,
    title: title.into(),
    description: description.into(),
    problem: problem.into(),
    hint: hint.into(),
    expected: answer.into(),
    flag_token: flag_token.into(),
  }
}

fn coding(
  id: u32,
  difficulty: Difficulty,
  title: &str,
  description: &str,
  problem: &str,
  expected_output: &str,
  flag_token: &str,
  hint: &str,
) -> Challenge {
  Challenge {
    id,
    difficulty,
    kind: ChallengeKind::Coding,
    source: ChallengeSource::BuiltIn,
    title: title.into(),
    description: description.into(),
    problem: problem.into(),
    hint: hint.into(),
    expected: expected_output.into(),
    flag_token: flag_token.into(),
  }
}

/// Built-in challenge bank for the IoT course. Guarantees the service is
/// useful even without an external TOML bank; a config bank can add more
/// under unused ids.
pub fn builtin_challenges() -> Vec<Challenge> {
  use Difficulty::{Easy, Hard, Medium};
  vec![
    theory(
      1,
      Easy,
      "IoT Architecture Basics",
      "Identify the Cisco IoT System Pillars",
      "How many pillars are in the Cisco IoT System architecture framework?",
      "6",
      "six_pillars_foundation",
      "When Cisco builds an IoT house, they don't use 4 walls or 5. Count the architectural supports in the connecting-things slides.",
    ),
    coding(
      2,
      Easy,
      "Temperature Sensor Reading",
      "Process IoT sensor data with Python",
      "Write Python code to calculate the average of these temperature readings:\ntemperatures = [22.5, 23.0, 24.5, 22.0, 23.5]\nStore the result in a variable called \"average\" and print it.",
      "23.1",
      "sensor_average_temp",
      "Use sum() and len() functions",
    ),
    theory(
      3,
      Easy,
      "Control System Types",
      "Distinguish control systems",
      "A thermostat that checks room temperature and adjusts heating is which type of control system? (enter: open or closed)",
      "closed",
      "feedback_loop_control",
      "Does it check the result and adjust?",
    ),
    coding(
      5,
      Easy,
      "IoT Device Status Check",
      "Basic conditional logic for IoT",
      "Write Python code to check if a sensor reading is abnormal:\nreading = 85\nIf reading > 80, print \"ALERT\"\nOtherwise, print \"NORMAL\"",
      "ALERT",
      "conditional_monitoring",
      "Use if-else statement",
    ),
    theory(
      6,
      Easy,
      "DIKW Model",
      "Data hierarchy understanding",
      "In the DIKW model, what comes after Data and before Knowledge? (one word, lowercase)",
      "information",
      "data_to_wisdom_path",
      "Processed data with context",
    ),
    coding(
      9,
      Easy,
      "Smart Device Counter",
      "Loop through IoT devices",
      "Write Python code to count devices that are \"online\":\ndevices = [\"online\", \"offline\", \"online\", \"online\", \"offline\"]\nCount and print the number of \"online\" devices.",
      "3",
      "device_status_count",
      "Use count() method or a loop",
    ),
    theory(
      10,
      Easy,
      "Network Protocol",
      "IoT communication basics",
      "What lightweight protocol is specifically designed for IoT devices? (4 letters, uppercase)",
      "MQTT",
      "message_queue_telemetry",
      "Shorter than a tweet but perfect for chatty sensors; a 4-letter superstar.",
    ),
    theory(
      11,
      Medium,
      "4Vs of Big Data",
      "Big Data characteristics analysis",
      "List all 4Vs of Big Data in alphabetical order, separated by commas (lowercase, no spaces)",
      "variety,velocity,veracity,volume",
      "four_vs_complete",
      "Think about amount, speed, types, and quality",
    ),
    coding(
      12,
      Medium,
      "Sensor Data Filtering",
      "Filter abnormal readings",
      "Write Python code to filter sensor readings that are within normal range (20-30):\nreadings = [18, 25, 32, 22, 28, 15, 29]\nCreate a list called \"normal\" with only valid readings and print it.",
      "[25, 22, 28, 29]",
      "data_filtering_range",
      "Use list comprehension or a loop with conditions",
    ),
    coding(
      13,
      Medium,
      "k-NN Distance Calculation",
      "Calculate Euclidean distance",
      "Write Python code to calculate Euclidean distance between two points:\npoint1 = (0, 0)\npoint2 = (3, 4)\nPrint the result.",
      "5.0",
      "euclidean_distance",
      "Import math module for sqrt()",
    ),
    coding(
      19,
      Medium,
      "Standard Deviation Calculation",
      "Statistical analysis with Python",
      "Write Python code to calculate standard deviation:\ndata = [2, 4, 6, 8, 10]\nUse the statistics module and print the result rounded to 2 decimal places.",
      "2.83",
      "spread_measurement",
      "import statistics; use stdev() and round()",
    ),
    theory(
      20,
      Medium,
      "NoSQL Database Type",
      "IoT data storage",
      "What type of database is specifically optimized for time-stamped sensor data? (two words, lowercase, hyphenated)",
      "time-series",
      "temporal_data_storage",
      "InfluxDB, TimescaleDB are examples",
    ),
    theory(
      31,
      Hard,
      "Advanced Fog Architecture",
      "Multi-layer edge computing",
      "In advanced fog computing, how many layers are typically involved? (number)",
      "3",
      "hierarchical_edge_layers",
      "Not one layer of mist; a triple-decker architecture.",
    ),
    coding(
      36,
      Hard,
      "ETL Pipeline Simulation",
      "Data transformation workflow",
      "Write Python code for ETL: Extract from dict, Transform (filter >10), Load (sum):\ndata = {\"s1\": 5, \"s2\": 15, \"s3\": 25}\nPrint sum of transformed.",
      "40",
      "workflow_automation",
      "Loop through values, condition, accumulate",
    ),
    theory(
      37,
      Hard,
      "IoT Ethical Concern",
      "Privacy in smart systems",
      "What GDPR principle requires data minimization in IoT? (two words, lowercase)",
      "purpose limitation",
      "data_privacy_compliance",
      "GDPR says: don't be a data hoarder. This principle keeps IoT systems honest about what they really need.",
    ),
    coding(
      40,
      Hard,
      "IoT Data Pipeline",
      "Complete ETL process simulation",
      "Write Python code for simple ETL:\ndata = [10, 20, None, 30, 40]\n1. Extract: Get non-None values\n2. Transform: Multiply each by 2\n3. Load: Print sum of transformed values",
      "200",
      "etl_pipeline_complete",
      "Filter None, multiply, then sum",
    ),
  ]
}
