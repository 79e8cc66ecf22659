use keldysh_contour::{
    ContourRead, ContourWrite, LocalCommunicator, LocalGroup, SliceArchive, Statistics,
    TimeSlice, TimesliceExchange, TimestepSource,
};
use utilities::reference_herm_matrix;

const NT: isize = 5;
const NTAU: usize = 6;
const SIZE: usize = 2;

fn on_group<T: Send>(size: usize, f: impl Fn(LocalCommunicator) -> T + Sync) -> Vec<T> {
    let f = &f;
    std::thread::scope(|scope| {
        let handles: Vec<_> = LocalGroup::new(size)
            .into_iter()
            .map(|comm| scope.spawn(move || f(comm)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

#[test]
fn scattered_slices_are_scaled_and_gathered_on_the_root() {
    let g = reference_herm_matrix(SIZE, NT, NTAU, Statistics::Fermion);
    let ranks = 3;

    let gathered = on_group(ranks, |comm| {
        let exchange = TimesliceExchange::new(&comm);
        let mut results = Vec::new();
        for (n, tstp) in (-1..=NT).enumerate() {
            let owner = n % ranks;
            let tag = n as i32;
            let mut slice = TimeSlice::default();
            if exchange.rank() == 0 {
                slice = g.timestep_view(tstp).to_timeslice();
                exchange.send(&slice, tstp, NTAU, SIZE, owner, tag).unwrap();
            }
            if exchange.rank() == owner {
                exchange.recv(&mut slice, tstp, NTAU, SIZE, 0, tag).unwrap();
                slice.smul(tstp, 3.);
            } else {
                slice.resize(tstp, NTAU, SIZE);
            }
            exchange.reduce(&mut slice, 0).unwrap();
            results.push(slice);
        }
        results
    });

    for (tstp, slice) in (-1..=NT).zip(&gathered[0]) {
        let mut expected = g.timestep_view(tstp).to_timeslice();
        expected.smul(tstp, 3.);
        assert_eq!(slice, &expected);
    }
}

#[test]
fn broadcast_slices_survive_an_archive_round_trip() {
    let g = reference_herm_matrix(SIZE, NT, NTAU, Statistics::Boson);
    let dir = tempfile::tempdir().unwrap();

    let received = on_group(2, |comm| {
        let exchange = TimesliceExchange::new(&comm);
        let mut slice = if exchange.rank() == 1 {
            g.timestep_view(NT).to_timeslice()
        } else {
            TimeSlice::default()
        };
        exchange.bcast(&mut slice, NT, NTAU, SIZE, 1).unwrap();
        slice
    });
    // statistics are not part of the payload
    assert_eq!(received[0].data(), received[1].data());
    assert_eq!(received[0].statistics(), Statistics::Fermion);

    let mut slice = received[0].clone();
    slice.set_statistics(Statistics::Boson);
    let mut archive = SliceArchive::new();
    slice.write_to_archive(&mut archive, "broadcast");
    let path = dir.path().join("broadcast.bin");
    archive.save(&path).unwrap();

    let mut back = TimeSlice::default();
    back.read_from_archive(&SliceArchive::load(&path).unwrap(), "broadcast")
        .unwrap();
    assert_eq!(back, g.timestep_view(NT).to_timeslice());
}
