use am_dispatch::AM::Queue::TodoList;

#[test]
fn pops_in_push_order() {
    let mut todo = TodoList::new(4);
    assert!(todo.is_empty());
    assert_eq!(todo.capacity(), 4);

    for s in [2, 0, 3] {
        todo.push(s);
    }
    assert_eq!(todo.len(), 3);
    assert!(todo.contains(3));
    assert_eq!(todo.iter().collect::<Vec<_>>(), vec![2, 0, 3]);

    assert_eq!(todo.pop(), Some(2));
    assert_eq!(todo.pop(), Some(0));
    assert_eq!(todo.pop(), Some(3));
    assert_eq!(todo.pop(), None);
    assert!(todo.is_empty());
}

#[test]
fn holds_every_sender_at_once() {
    let nodes = 5;
    let mut todo = TodoList::new(nodes);
    // rotate the cursors so the full list straddles the wrap point
    for _ in 0..3 {
        todo.push(0);
        todo.pop();
    }
    for s in 0..nodes as u32 {
        todo.push(s);
        assert!(!todo.is_empty());
    }
    assert_eq!(todo.len(), nodes);
    for s in 0..nodes as u32 {
        assert_eq!(todo.pop(), Some(s));
    }
    assert!(todo.is_empty());
}

#[test]
fn never_reports_full_as_empty() {
    let nodes = 3;
    let mut todo = TodoList::new(nodes);
    let mut live = std::collections::VecDeque::new();
    let mut next = 0u32;

    for _ in 0..10_000 {
        if live.len() < nodes && (live.is_empty() || fastrand::bool()) {
            todo.push(next);
            live.push_back(next);
            next = (next + 1) % nodes as u32;
        } else {
            assert_eq!(todo.pop(), live.pop_front());
        }
        assert_eq!(todo.is_empty(), live.is_empty());
        assert_eq!(todo.len(), live.len());
    }
}

#[test]
#[should_panic(expected = "todo list overflow")]
fn overflow_is_fatal() {
    let mut todo = TodoList::new(2);
    todo.push(0);
    todo.push(1);
    todo.push(0);
}
