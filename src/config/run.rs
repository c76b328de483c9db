/// Parameters of one headless run, as opposed to the physics parameters in
/// `SimParams`.
pub struct RunConfig {
    pub t_max: f64,
    /// Steps between checkpoint writes.
    pub dstep_checkpoint: usize,
}
