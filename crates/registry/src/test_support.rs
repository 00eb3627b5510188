use crate::{CommandContext, Controller, ControllerDescriptor, KernelError};

/// Controller with a fixed descriptor whose commands do nothing.
pub(crate) struct StubController {
    descriptor: ControllerDescriptor,
}

impl StubController {
    pub(crate) fn new(descriptor: ControllerDescriptor) -> Self {
        Self { descriptor }
    }
}

#[async_trait::async_trait]
impl Controller for StubController {
    fn descriptor(&self) -> ControllerDescriptor {
        self.descriptor.clone()
    }

    async fn run(&self, _command: &str, _ctx: &mut CommandContext<'_>) -> Result<(), KernelError> {
        Ok(())
    }
}
