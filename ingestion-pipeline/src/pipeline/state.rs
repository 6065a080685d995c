use state_machines::state_machine;

state_machine! {
    name: IngestionMachine,
    state: IngestionState,
    initial: Ready,
    states: [Ready, DocumentRead, Chunked, Embedded],
    events {
        read { transition: { from: Ready, to: DocumentRead } }
        chunk { transition: { from: DocumentRead, to: Chunked } }
        embed { transition: { from: Chunked, to: Embedded } }
    }
}

pub fn ready() -> IngestionMachine<(), Ready> {
    IngestionMachine::new(())
}
