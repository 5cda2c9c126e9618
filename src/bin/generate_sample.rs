/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let n_students = 200;

    let output_path = "student_habits_performance.csv";
    let mut writer = csv::Writer::from_path(output_path).expect("Failed to create output file");
    writer
        .write_record([
            "student_id",
            "age",
            "gender",
            "study_hours_per_day",
            "social_media_hours",
            "part_time_job",
            "attendance_percentage",
            "sleep_hours",
            "exam_score",
        ])
        .expect("Failed to write header");

    for i in 0..n_students {
        let gender = if rng.next_f64() < 0.5 { "Male" } else { "Female" };
        let age = 17 + (rng.next_u64() % 8) as i64;
        let study_hours = clamp(rng.gauss(3.5, 1.2), 0.0, 10.0);
        let social_media = clamp(rng.gauss(2.5, 1.0), 0.0, 8.0);
        let part_time_job = rng.next_f64() < 0.3;
        let attendance = clamp(rng.gauss(85.0, 10.0), 40.0, 100.0);
        let sleep_hours = clamp(rng.gauss(6.8, 1.1), 3.0, 10.0);

        // Score driven by habits plus noise, clamped to [0, 100].
        let score = clamp(
            35.0 + 8.0 * study_hours - 2.0 * social_media
                + 0.25 * attendance
                + 1.5 * (sleep_hours - 6.0)
                + rng.gauss(0.0, 5.0),
            0.0,
            100.0,
        );

        writer
            .write_record([
                format!("S{:04}", i + 1),
                age.to_string(),
                gender.to_string(),
                format!("{study_hours:.1}"),
                format!("{social_media:.1}"),
                part_time_job.to_string(),
                format!("{attendance:.1}"),
                format!("{sleep_hours:.1}"),
                format!("{score:.1}"),
            ])
            .expect("Failed to write record");
    }

    writer.flush().expect("Failed to flush output");
    println!("Wrote {n_students} students to {output_path}");
}
