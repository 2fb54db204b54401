//! Arithmetic primitives.
//!
//! - **Modular arithmetic** over Z_q and elementary number theory
//!   (orders, totient, factorisation) used to build the hypercube
//! - **Dense polynomials** over Z_q with irreducibility testing, used to
//!   pick and lift the slot modulus
//! - **Sampling** of LWE noise and sparse secrets

pub mod modular;
pub mod poly;
pub mod sampling;

pub use modular::ModQ;
pub use poly::Poly;
pub use sampling::GaussianSampler;
