pub trait LlmProvider: Send + Sync {
    /// Send a single prompt to the model and return its text reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be reached, rejects the request,
    /// or replies with something that is not a usable answer.
    fn generate(&self, prompt: &str) -> impl Future<Output = crate::Result<String>> + Send;

    fn name(&self) -> &'static str;
}
