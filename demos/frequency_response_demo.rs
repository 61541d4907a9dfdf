//! Demonstration of frequency response evaluation using TB05AD
//!
//! This example computes the Bode magnitude and phase of a lightly damped
//! two-mass system, first with a single TB05AD call and then with a sweep
//! that reduces the system to Hessenberg form only once.

use ndarray::arr2;
use num_complex::Complex64;
use slicot_freqresp::tb::{tb05ad, tb05ad_sweep};

fn main() {
    println!("=== Frequency Response Demonstration ===\n");

    // Two masses coupled by a spring, force on mass 1, position of mass 2.
    // States: x1, x2, v1, v2
    let k = 4.0;
    let d = 0.05;
    let a = arr2(&[
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
        [-k, k, -d, d],
        [k, -k, d, -d - 0.1],
    ]);
    let b = arr2(&[[0.0], [0.0], [1.0], [0.0]]);
    let c = arr2(&[[0.0, 1.0, 0.0, 0.0]]);

    println!("A = \n{:?}", a);

    let freq = Complex64::new(0.0, 1.0);
    match tb05ad(4, 1, 1, freq, &a, &b, &c, "AG") {
        Ok(result) => {
            let balance = result.balance.as_ref();
            if let Some(bal) = balance {
                println!("\nBalancing: ilo = {}, ihi = {}", bal.ilo, bal.ihi);
            }
            if let Some(resp) = result.response {
                println!("G(j*1) = {:.6}", resp.g[(0, 0)]);
                println!("rcond  = {:.3e}", resp.rcond);
                println!("\nEigenvalues of A:");
                for ev in resp.eigenvalues.iter() {
                    println!("  λ = {:.4} + {:.4}i", ev.re, ev.im);
                }
            }
        }
        Err(e) => println!("TB05AD failed (info = {}): {}", e.info(), e),
    }

    // Logarithmic sweep from 0.1 to 10 rad/s.
    let freqs: Vec<Complex64> = (0..=20)
        .map(|i| Complex64::new(0.0, 10f64.powf(-1.0 + 0.1 * i as f64)))
        .collect();

    println!("\n=== Bode Table ===");
    println!("{:>10} {:>12} {:>10}", "ω [rad/s]", "|G| [dB]", "∠G [deg]");
    match tb05ad_sweep(&a, &b, &c, &freqs) {
        Ok(responses) => {
            for (freq, g) in freqs.iter().zip(responses.iter()) {
                let g = g[(0, 0)];
                println!(
                    "{:>10.4} {:>12.4} {:>10.2}",
                    freq.im,
                    20.0 * g.norm().log10(),
                    g.arg().to_degrees()
                );
            }
        }
        Err(e) => println!("Sweep stopped (info = {}): {}", e.info(), e),
    }
}
